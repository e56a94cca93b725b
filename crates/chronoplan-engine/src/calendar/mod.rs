//! Working-time calendars: weekly wall-clock patterns, leaves and shifts.
//!
//! Everything in the engine runs on UTC instants; this module is the only
//! place where instants are interpreted as local wall-clock time. All
//! timezone and DST resolution is delegated to `chrono-tz`.

pub mod leave;
pub mod shift;
pub mod working_hours;

pub use leave::{Leave, LeaveKind};
pub use shift::{Shift, ShiftAssignment};
pub use working_hours::{weekdays, WeeklyPattern};
