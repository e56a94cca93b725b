//! chronoplan scheduling engine
//!
//! Deterministic slot-based project scheduling: a populated [`Project`] is
//! solved by [`Project::schedule`], which books resources into discrete time
//! slots honoring working calendars, leaves, booking limits, efficiency,
//! priorities and dependency anchors. The solve is single-threaded, performs
//! no I/O, and is reproducible bit-for-bit.

pub mod calendar;
pub mod engine;
pub mod limits;
pub mod model;
pub mod report;
pub mod rng;
pub mod scoreboard;

pub use calendar::{weekdays, Leave, LeaveKind, Shift, ShiftAssignment, WeeklyPattern};
pub use limits::{LimitPeriod, LimitSpec, Limits, MonthPolicy};
pub use model::{
    Allocation, DependencySpec, GapMode, Project, Resource, ResourceId, Scenario, ScheduleMode,
    SelectionMode, ShiftId, Task, TaskId,
};
pub use report::{Column, CsvTable, TaskReport};
pub use scoreboard::{Scoreboard, SlotIdx};

pub use chronoplan_common::{
    AttrValue, Message, MessageLog, SchedulingError, Severity, TimeInterval,
};

/// Seconds in `h` hours, rounded to the nearest second.
pub fn hours(h: f64) -> i64 {
    (h * 3600.0).round() as i64
}

/// Seconds in `m` minutes.
pub fn minutes(m: i64) -> i64 {
    m * 60
}

/// Seconds in `d` days of calendar time.
pub fn days(d: i64) -> i64 {
    d * 86_400
}
