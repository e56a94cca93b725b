//! Follow-the-sun handoff: working hours are local wall time, the schedule
//! is UTC, and daylight saving offsets apply.

use super::util::{date, project};
use crate::calendar::{weekdays, WeeklyPattern};
use crate::model::DependencySpec;
use crate::hours;
use chrono::Weekday;

fn local_9_to_6() -> WeeklyPattern {
    let mut p = WeeklyPattern::empty();
    p.set_hours(&weekdays(Weekday::Mon, Weekday::Fri), &[((9, 0), (18, 0))])
        .unwrap();
    p
}

#[test]
fn tokyo_to_new_york_handoff() {
    let mut p = project(date(2025, 5, 1, 0, 0), date(2025, 5, 8, 0, 0));

    let team = p.add_resource(None, "team", "Global Team").unwrap();
    let jp = p.add_resource(Some(team), "dev_jp", "Tokyo Dev").unwrap();
    p.resource_mut(jp).set_timezone("Asia/Tokyo").unwrap();
    p.resource_mut(jp).set_working_hours(local_9_to_6());
    let ny = p.add_resource(Some(team), "qa_ny", "NY QA").unwrap();
    p.resource_mut(ny).set_timezone("America/New_York").unwrap();
    p.resource_mut(ny).set_working_hours(local_9_to_6());

    let handover = p.add_task(None, "follow_sun", "Handover").unwrap();
    let build = p.add_task(Some(handover), "step1_jp", "Build").unwrap();
    p.task_mut(build)
        .set_effort(hours(9.0))
        .set_start(date(2025, 5, 1, 0, 0))
        .allocate("dev_jp");
    let test = p.add_task(Some(handover), "step2_ny", "Test").unwrap();
    p.task_mut(test)
        .set_effort(hours(4.0))
        .add_depends(DependencySpec::new("step1_jp"))
        .allocate("qa_ny");

    assert!(p.schedule());

    // Tokyo's 09:00-18:00 JST is 00:00-09:00 UTC; nine hours fit exactly.
    assert_eq!(p.task(build).start(0), Some(date(2025, 5, 1, 0, 0)));
    assert_eq!(p.task(build).end(0), Some(date(2025, 5, 1, 9, 0)));

    // 09:00 UTC is 05:00 in New York; QA waits for 09:00 EDT = 13:00 UTC.
    assert_eq!(p.task(test).start(0), Some(date(2025, 5, 1, 13, 0)));
    assert_eq!(p.task(test).end(0), Some(date(2025, 5, 1, 17, 0)));
}

#[test]
fn winter_offset_differs_from_summer() {
    // Same setup in January: New York is EST (UTC-5), so the local 09:00
    // shift start is 14:00 UTC.
    let mut p = project(date(2025, 1, 6, 0, 0), date(2025, 1, 13, 0, 0));
    let ny = p.add_resource(None, "qa_ny", "NY QA").unwrap();
    p.resource_mut(ny).set_timezone("America/New_York").unwrap();
    p.resource_mut(ny).set_working_hours(local_9_to_6());

    let t = p.add_task(None, "t", "Winter Task").unwrap();
    p.task_mut(t)
        .set_effort(hours(2.0))
        .set_start(date(2025, 1, 6, 0, 0))
        .allocate("qa_ny");

    assert!(p.schedule());
    assert_eq!(p.task(t).start(0), Some(date(2025, 1, 6, 14, 0)));
    assert_eq!(p.task(t).end(0), Some(date(2025, 1, 6, 16, 0)));
}
