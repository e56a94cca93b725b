//! Multi-allocation slots are all-or-nothing: when one mandatory allocation
//! cannot book, tentative bookings from the same slot are rolled back
//! without a trace.

use super::util::{date, project};
use crate::limits::LimitSpec;
use crate::model::{Allocation, SelectionMode};
use crate::scoreboard::cell;
use crate::hours;

#[test]
fn failed_mandatory_allocation_reverts_the_whole_slot() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 5, 0, 0));
    p.add_resource(None, "dev", "Dev").unwrap();
    let hermit = p.add_resource(None, "hermit", "Never Works").unwrap();
    p.resource_mut(hermit)
        .set_working_hours(crate::calendar::WeeklyPattern::empty());

    let t = p.add_task(None, "t", "Pair Work").unwrap();
    p.task_mut(t)
        .set_effort(hours(2.0))
        .set_start(date(2025, 9, 1, 9, 0))
        .allocate("dev")
        .allocate("hermit");

    assert!(!p.schedule());

    // The dev side was tentatively booked each slot and rolled back each
    // time; nothing may stick.
    let dev = p.resource_id("dev").unwrap();
    let data = p.resource(dev).data(0);
    assert_eq!(data.booked_slots, 0);
    assert!(data.duties.is_empty());
    assert!((data.booked_effort).abs() < 1e-9);
    let sb = data.scoreboard.as_ref().unwrap();
    assert!(sb.iter().all(|c| !cell::is_booked(c)));
    assert!((p.task(t).effort_done(0)).abs() < 1e-9);
}

#[test]
fn limit_blocked_partner_also_reverts_the_slot() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 12, 0, 0));
    p.add_resource(None, "dev", "Dev").unwrap();
    let qa = p.add_resource(None, "qa", "QA").unwrap();
    p.resource_mut(qa).add_limit(LimitSpec::daily_max(hours(2.0)));

    let t = p.add_task(None, "t", "Pair Work").unwrap();
    p.task_mut(t)
        .set_effort(hours(8.0))
        .set_start(date(2025, 9, 1, 9, 0))
        .allocate("dev")
        .allocate("qa");

    assert!(p.schedule());

    // Two joint hours per day, four effort hours per day, done on day two;
    // dev never books beyond what QA could match.
    assert_eq!(p.task(t).end(0), Some(date(2025, 9, 2, 11, 0)));
    let dev = p.resource_id("dev").unwrap();
    assert_eq!(p.resource(dev).data(0).booked_slots, 4);
}

#[test]
fn optional_allocation_does_not_hold_up_the_slot() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 5, 0, 0));
    p.add_resource(None, "dev", "Dev").unwrap();
    let hermit = p.add_resource(None, "hermit", "Never Works").unwrap();
    p.resource_mut(hermit)
        .set_working_hours(crate::calendar::WeeklyPattern::empty());

    let t = p.add_task(None, "t", "Solo If Needed").unwrap();
    p.task_mut(t)
        .set_effort(hours(2.0))
        .set_start(date(2025, 9, 1, 9, 0))
        .allocate("dev")
        .add_allocation(Allocation::new(["hermit"]).optional());

    assert!(p.schedule());
    assert_eq!(p.task(t).end(0), Some(date(2025, 9, 1, 11, 0)));
}

#[test]
fn min_loaded_selection_balances_two_peers() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 5, 0, 0));
    p.add_resource(None, "r1", "Peer One").unwrap();
    p.add_resource(None, "r2", "Peer Two").unwrap();

    let t = p.add_task(None, "t", "Balanced").unwrap();
    p.task_mut(t)
        .set_effort(hours(4.0))
        .set_start(date(2025, 9, 1, 9, 0))
        .add_allocation(Allocation::new(["r1", "r2"]).select(SelectionMode::MinLoaded));

    assert!(p.schedule());

    // One resource per slot, alternating as the booked effort see-saws.
    let r1 = p.resource_id("r1").unwrap();
    let r2 = p.resource_id("r2").unwrap();
    assert_eq!(p.resource(r1).data(0).booked_slots, 2);
    assert_eq!(p.resource(r2).data(0).booked_slots, 2);
}

#[test]
fn persistent_allocation_sticks_with_its_first_pick() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 5, 0, 0));
    p.add_resource(None, "r1", "Peer One").unwrap();
    p.add_resource(None, "r2", "Peer Two").unwrap();

    let t = p.add_task(None, "t", "Loyal").unwrap();
    p.task_mut(t)
        .set_effort(hours(4.0))
        .set_start(date(2025, 9, 1, 9, 0))
        .add_allocation(
            Allocation::new(["r1", "r2"])
                .select(SelectionMode::MinLoaded)
                .persistent(),
        );

    assert!(p.schedule());
    let r1 = p.resource_id("r1").unwrap();
    let r2 = p.resource_id("r2").unwrap();
    assert_eq!(p.resource(r1).data(0).booked_slots, 4);
    assert_eq!(p.resource(r2).data(0).booked_slots, 0);
}

#[test]
fn group_candidate_expands_to_leaves_in_tree_order() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 5, 0, 0));
    let team = p.add_resource(None, "team", "Team").unwrap();
    p.add_resource(Some(team), "alice", "Alice").unwrap();
    p.add_resource(Some(team), "bob", "Bob").unwrap();

    let t = p.add_task(None, "t", "Teamwork").unwrap();
    p.task_mut(t)
        .set_effort(hours(2.0))
        .set_start(date(2025, 9, 1, 9, 0))
        .allocate("team");

    assert!(p.schedule());
    // Declaration-order selection books the first leaf of the group.
    let alice = p.resource_id("team.alice").unwrap();
    let bob = p.resource_id("team.bob").unwrap();
    assert_eq!(p.resource(alice).data(0).booked_slots, 2);
    assert_eq!(p.resource(bob).data(0).booked_slots, 0);
}
