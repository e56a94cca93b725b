use super::TaskId;

/// How a dependency gap is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapMode {
    /// Plain wall-clock seconds.
    #[default]
    Calendar,
    /// Seconds of working time, walked over the project default calendar.
    Working,
}

/// An unresolved dependency as declared on a task.
///
/// `task` is a reference string: a fully qualified dotted id, an id relative
/// to an enclosing container, or a globally unique short id. Resolution
/// happens in the prepare pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencySpec {
    pub task: String,
    /// Gap between the reference point and this task, in seconds.
    pub gap: i64,
    pub gap_mode: GapMode,
    /// Reference point on the other task; `None` picks the natural side
    /// (predecessor end for `depends`, successor start for `precedes`).
    pub on_end: Option<bool>,
}

impl DependencySpec {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            gap: 0,
            gap_mode: GapMode::Calendar,
            on_end: None,
        }
    }

    /// Calendar-time gap in seconds.
    pub fn gap(mut self, seconds: i64) -> Self {
        self.gap = seconds;
        self.gap_mode = GapMode::Calendar;
        self
    }

    /// Working-time gap in seconds.
    pub fn gap_working(mut self, seconds: i64) -> Self {
        self.gap = seconds;
        self.gap_mode = GapMode::Working;
        self
    }

    /// Anchor on the other task's start instead of the default side.
    pub fn on_start(mut self) -> Self {
        self.on_end = Some(false);
        self
    }

    /// Anchor on the other task's end.
    pub fn on_end(mut self) -> Self {
        self.on_end = Some(true);
        self
    }
}

impl<S: Into<String>> From<S> for DependencySpec {
    fn from(task: S) -> Self {
        DependencySpec::new(task)
    }
}

/// A resolved dependency edge, produced by the prepare pass.
///
/// On a `depends` list the edge reads "my start is at least the target's
/// reference point plus gap"; on a `precedes` list, "my end is at most the
/// target's reference point minus gap". Mirrored edges whose declared
/// reference point cannot bound this side keep `bounding = false`: they
/// still gate readiness but contribute nothing to anchor arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DepEdge {
    pub target: TaskId,
    pub gap: i64,
    pub gap_mode: GapMode,
    /// True when the reference point is the target's end.
    pub on_end: bool,
    pub bounding: bool,
}
