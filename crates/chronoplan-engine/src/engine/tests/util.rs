use crate::model::Project;
use chrono::{DateTime, TimeZone, Utc};
use chronoplan_common::TimeInterval;

pub fn date(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

pub fn day(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
    date(y, mo, d, 0, 0)
}

/// Whole-day interval, midnight to midnight.
pub fn day_interval(y: i32, mo: u32, d: u32) -> TimeInterval {
    let start = day(y, mo, d);
    TimeInterval::new(start, start + chrono::Duration::days(1))
}

pub fn project(start: DateTime<Utc>, end: DateTime<Utc>) -> Project {
    Project::new("prj", "Test Project", "1.0", start, end).unwrap()
}
