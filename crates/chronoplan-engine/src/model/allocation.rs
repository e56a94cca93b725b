use super::{ResourceId, ShiftId};
use smallvec::SmallVec;

/// How a candidate is picked from an allocation's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Declaration order.
    #[default]
    Order,
    /// Least allocated first; falls back to criticalness ordering.
    MinAllocated,
    /// Least booked effort at the moment of decision.
    MinLoaded,
    /// Most booked effort at the moment of decision.
    MaxLoaded,
    /// Seeded uniform shuffle.
    Random,
}

/// A task's demand for one resource out of a candidate list.
///
/// Candidates are reference strings resolved during prepare; a group
/// resource expands to its leaf descendants in tree order.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub candidates: Vec<String>,
    pub mode: SelectionMode,
    /// Once a resource is picked, keep using it for subsequent slots.
    pub persistent: bool,
    /// A slot books this allocation or the whole slot is lost for the task.
    pub mandatory: bool,
    /// All of the task's allocations must book in a slot or none does.
    pub atomic: bool,
    /// Restrict bookable slots to this shift's working pattern.
    pub shift: Option<ShiftId>,

    pub(crate) resolved: SmallVec<[ResourceId; 4]>,
    pub(crate) locked: Option<ResourceId>,
    pub(crate) cached_order: Option<SmallVec<[ResourceId; 4]>>,
}

impl Allocation {
    pub fn new<I>(candidates: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            mode: SelectionMode::Order,
            persistent: false,
            mandatory: true,
            atomic: false,
            shift: None,
            resolved: SmallVec::new(),
            locked: None,
            cached_order: None,
        }
    }

    pub fn select(mut self, mode: SelectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// A slot that cannot book this allocation may still book the others.
    pub fn optional(mut self) -> Self {
        self.mandatory = false;
        self
    }

    pub fn atomic(mut self) -> Self {
        self.atomic = true;
        self
    }

    pub fn restricted_to_shift(mut self, shift: ShiftId) -> Self {
        self.shift = Some(shift);
        self
    }

    pub(crate) fn reset_schedule_state(&mut self) {
        self.resolved.clear();
        self.locked = None;
        self.cached_order = None;
    }
}
