//! Milestones: explicit, implicit (an endpoint with no duration category),
//! and dependency-anchored zero-width tasks.

use super::util::{date, project};
use crate::model::DependencySpec;
use crate::hours;

#[test]
fn explicit_milestone_pins_both_endpoints() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 15, 0, 0));
    let m = p.add_task(None, "kickoff", "Kickoff").unwrap();
    p.task_mut(m).set_milestone().set_start(date(2025, 9, 3, 12, 0));

    assert!(p.schedule());
    assert_eq!(p.task(m).start(0), Some(date(2025, 9, 3, 12, 0)));
    assert_eq!(p.task(m).end(0), Some(date(2025, 9, 3, 12, 0)));
}

#[test]
fn endpoint_without_duration_category_is_an_implicit_milestone() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 15, 0, 0));
    let m = p.add_task(None, "gate", "Gate").unwrap();
    p.task_mut(m).set_end(date(2025, 9, 4, 9, 0));

    assert!(p.schedule());
    assert_eq!(p.task(m).start(0), Some(date(2025, 9, 4, 9, 0)));
    assert_eq!(p.task(m).end(0), Some(date(2025, 9, 4, 9, 0)));
}

#[test]
fn dependency_anchored_milestone_takes_the_predecessor_end() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 15, 0, 0));
    p.add_resource(None, "dev", "Dev").unwrap();

    let work = p.add_task(None, "work", "Work").unwrap();
    p.task_mut(work)
        .set_effort(hours(8.0))
        .set_start(date(2025, 9, 1, 9, 0))
        .allocate("dev");
    let m = p.add_task(None, "done", "Done Marker").unwrap();
    p.task_mut(m)
        .set_milestone()
        .add_depends(DependencySpec::new("work"));

    assert!(p.schedule());
    assert_eq!(p.task(m).start(0), Some(date(2025, 9, 1, 17, 0)));
    assert_eq!(p.task(m).end(0), Some(date(2025, 9, 1, 17, 0)));
}
