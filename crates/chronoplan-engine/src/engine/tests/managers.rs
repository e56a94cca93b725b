//! Manager graph validation during prepare.

use super::util::{date, project};
use crate::hours;

#[test]
fn valid_manager_chain_builds_reports() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 15, 0, 0));
    let boss = p.add_resource(None, "boss", "Boss").unwrap();
    let dev = p.add_resource(None, "dev", "Dev").unwrap();
    p.resource_mut(dev).add_manager("boss");

    let t = p.add_task(None, "t", "Task").unwrap();
    p.task_mut(t)
        .set_effort(hours(8.0))
        .set_start(date(2025, 9, 1, 9, 0))
        .allocate("dev");

    assert!(p.schedule());
    assert_eq!(p.resource(dev).data(0).managers, vec![boss]);
    assert_eq!(p.resource(boss).data(0).reports, vec![dev]);
}

#[test]
fn unknown_manager_is_an_error() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 15, 0, 0));
    let dev = p.add_resource(None, "dev", "Dev").unwrap();
    p.resource_mut(dev).add_manager("nobody");
    p.add_task(None, "t", "Task").unwrap();

    assert!(!p.schedule());
    assert_eq!(p.messages().with_id("resource_id_expected").count(), 1);
}

#[test]
fn group_manager_is_rejected() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 15, 0, 0));
    let team = p.add_resource(None, "team", "Team").unwrap();
    p.add_resource(Some(team), "lead", "Lead").unwrap();
    let dev = p.add_resource(None, "dev", "Dev").unwrap();
    p.resource_mut(dev).add_manager("team");
    p.add_task(None, "t", "Task").unwrap();

    assert!(!p.schedule());
    assert_eq!(p.messages().with_id("manager_is_group").count(), 1);
}

#[test]
fn self_management_is_rejected() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 15, 0, 0));
    let dev = p.add_resource(None, "dev", "Dev").unwrap();
    p.resource_mut(dev).add_manager("dev");
    p.add_task(None, "t", "Task").unwrap();

    assert!(!p.schedule());
    assert_eq!(p.messages().with_id("manager_is_self").count(), 1);
}

#[test]
fn management_cycle_is_reported() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 15, 0, 0));
    let a = p.add_resource(None, "a", "A").unwrap();
    let b = p.add_resource(None, "b", "B").unwrap();
    p.resource_mut(a).add_manager("b");
    p.resource_mut(b).add_manager("a");
    p.add_task(None, "t", "Task").unwrap();

    assert!(!p.schedule());
    assert!(p.messages().with_id("manager_loop").count() >= 1);
}
