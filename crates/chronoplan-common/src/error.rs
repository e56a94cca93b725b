use thiserror::Error;

/// Hard failures raised while building or driving a project.
///
/// These are API-misuse conditions; problems the scheduler can work around
/// (deadlocks, runaway tasks, limit rejections) are reported through the
/// [`crate::MessageLog`] instead and never abort a solve.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulingError {
    #[error("project interval is empty or inverted")]
    EmptyProjectInterval,

    #[error("granularity {0}s is outside the supported 60..=86400 range")]
    InvalidGranularity(i64),

    #[error("granularity cannot change after scheduling has started")]
    GranularityFrozen,

    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("efficiency must be positive, got {0}")]
    InvalidEfficiency(f64),

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("working-hour interval {0} is malformed")]
    InvalidWorkingInterval(String),
}
