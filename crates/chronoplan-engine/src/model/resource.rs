use super::{ResourceId, TaskId};
use crate::calendar::{Leave, ShiftAssignment, WeeklyPattern};
use crate::limits::{Limits, LimitSpec};
use crate::scoreboard::{Scoreboard, SlotIdx};
use chrono_tz::Tz;
use chronoplan_common::{SchedulingError, TimeInterval};
use rustc_hash::FxHashMap;

/// Per-scenario resource state: the scoreboard, limit counters and booking
/// aggregates the scheduler mutates.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    pub(crate) scoreboard: Option<Scoreboard>,
    pub(crate) limits: Limits,
    /// Slots booked in this scenario.
    pub(crate) booked_slots: u32,
    /// Booked slots weighted by efficiency and granularity, in seconds of
    /// work. Drives the load-based selection modes.
    pub(crate) booked_effort: f64,
    /// Tasks this resource holds bookings for, in first-booking order.
    pub(crate) duties: Vec<TaskId>,
    /// First and last booked slot per duty task.
    pub(crate) booked_span: FxHashMap<TaskId, (SlotIdx, SlotIdx)>,
    pub(crate) first_booked: Option<SlotIdx>,
    pub(crate) last_booked: Option<SlotIdx>,
    /// Demanded work over the scenario, in seconds; input to criticalness.
    pub(crate) alloc_demand: f64,
    pub(crate) criticalness: f64,
    pub(crate) managers: Vec<ResourceId>,
    pub(crate) reports: Vec<ResourceId>,
}

impl ResourceData {
    pub(crate) fn reset_schedule_state(&mut self) {
        self.scoreboard = None;
        self.limits = Limits::default();
        self.booked_slots = 0;
        self.booked_effort = 0.0;
        self.duties.clear();
        self.booked_span.clear();
        self.first_booked = None;
        self.last_booked = None;
        self.alloc_demand = 0.0;
        self.criticalness = 0.0;
        self.managers.clear();
        self.reports.clear();
    }

    pub(crate) fn note_booking(&mut self, task: TaskId, slot: SlotIdx) {
        self.first_booked = Some(self.first_booked.map_or(slot, |s| s.min(slot)));
        self.last_booked = Some(self.last_booked.map_or(slot, |s| s.max(slot)));
        self.booked_span
            .entry(task)
            .and_modify(|(first, last)| {
                *first = (*first).min(slot);
                *last = (*last).max(slot);
            })
            .or_insert((slot, slot));
    }
}

/// A node of the resource tree. Leaves can be booked; groups aggregate and
/// expand to their leaf descendants when used as allocation candidates.
#[derive(Debug, Clone)]
pub struct Resource {
    pub(crate) id: String,
    pub(crate) full_id: String,
    pub name: String,
    pub(crate) parent: Option<ResourceId>,
    pub(crate) children: Vec<ResourceId>,
    pub(crate) seqno: usize,

    pub efficiency: f64,
    /// Daily rate; falls back to the project rate when unset.
    pub rate: Option<f64>,
    /// Timezone the working hours are interpreted in; project timezone when
    /// unset.
    pub timezone: Option<Tz>,
    /// Weekly pattern; the project default pattern applies when unset.
    pub working_hours: Option<WeeklyPattern>,
    pub leaves: Vec<Leave>,
    pub shift_assignments: Vec<ShiftAssignment>,
    pub limit_specs: Vec<LimitSpec>,
    /// Manager references, resolved and validated during prepare.
    pub managers: Vec<String>,

    pub(crate) data: Vec<ResourceData>,
}

impl Resource {
    pub(crate) fn new(
        id: String,
        full_id: String,
        name: String,
        parent: Option<ResourceId>,
        seqno: usize,
        scenarios: usize,
    ) -> Self {
        Self {
            id,
            full_id,
            name,
            parent,
            children: Vec::new(),
            seqno,
            efficiency: 1.0,
            rate: None,
            timezone: None,
            working_hours: None,
            leaves: Vec::new(),
            shift_assignments: Vec::new(),
            limit_specs: Vec::new(),
            managers: Vec::new(),
            data: vec![ResourceData::default(); scenarios],
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn full_id(&self) -> &str {
        &self.full_id
    }

    pub fn parent(&self) -> Option<ResourceId> {
        self.parent
    }

    pub fn children(&self) -> &[ResourceId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn set_efficiency(&mut self, efficiency: f64) -> Result<&mut Self, SchedulingError> {
        if !(efficiency > 0.0) {
            return Err(SchedulingError::InvalidEfficiency(efficiency));
        }
        self.efficiency = efficiency;
        Ok(self)
    }

    pub fn set_timezone(&mut self, tz: &str) -> Result<&mut Self, SchedulingError> {
        self.timezone = Some(
            tz.parse()
                .map_err(|_| SchedulingError::UnknownTimezone(tz.to_string()))?,
        );
        Ok(self)
    }

    pub fn set_working_hours(&mut self, pattern: WeeklyPattern) -> &mut Self {
        self.working_hours = Some(pattern);
        self
    }

    pub fn set_rate(&mut self, rate: f64) -> &mut Self {
        self.rate = Some(rate);
        self
    }

    pub fn add_leave(&mut self, leave: Leave) -> &mut Self {
        self.leaves.push(leave);
        self
    }

    pub fn add_shift_assignment(&mut self, assignment: ShiftAssignment) -> &mut Self {
        self.shift_assignments.push(assignment);
        self
    }

    pub fn add_limit(&mut self, spec: LimitSpec) -> &mut Self {
        self.limit_specs.push(spec);
        self
    }

    pub fn add_manager(&mut self, manager: impl Into<String>) -> &mut Self {
        self.managers.push(manager.into());
        self
    }

    pub fn data(&self, scenario: usize) -> &ResourceData {
        &self.data[scenario]
    }

    /// Tasks this resource was booked for, in first-booking order.
    pub fn duties(&self, scenario: usize) -> &[TaskId] {
        &self.data[scenario].duties
    }

    pub fn criticalness(&self, scenario: usize) -> f64 {
        self.data[scenario].criticalness
    }

    /// Booked work in seconds, weighted by efficiency.
    pub fn booked_effort(&self, scenario: usize) -> f64 {
        self.data[scenario].booked_effort
    }

    /// Interval spanning every booking of this resource in the scenario.
    pub fn booked_interval(&self, scenario: usize) -> Option<TimeInterval> {
        let data = &self.data[scenario];
        let sb = data.scoreboard.as_ref()?;
        Some(TimeInterval::new(
            sb.idx_to_date(data.first_booked?),
            sb.idx_to_date(data.last_booked? + 1),
        ))
    }

    /// Interval spanning this resource's bookings for one task.
    pub fn task_booked_interval(&self, scenario: usize, task: TaskId) -> Option<TimeInterval> {
        let data = &self.data[scenario];
        let sb = data.scoreboard.as_ref()?;
        let &(first, last) = data.booked_span.get(&task)?;
        Some(TimeInterval::new(
            sb.idx_to_date(first),
            sb.idx_to_date(last + 1),
        ))
    }
}
