//! Efficiency scaling: a slow resource needs proportionally more working
//! time, and must navigate fragmented shifts and offset work weeks.

use super::util::{date, project};
use crate::calendar::{weekdays, WeeklyPattern};
use crate::model::DependencySpec;
use crate::hours;
use chrono::Weekday;

#[test]
fn half_efficiency_navigates_a_fragmented_shift() {
    let mut p = project(date(2025, 11, 1, 0, 0), date(2025, 11, 8, 0, 0));
    let mut swiss_cheese = WeeklyPattern::empty();
    swiss_cheese
        .set_hours(
            &weekdays(Weekday::Mon, Weekday::Fri),
            &[
                ((9, 0), (10, 0)),
                ((11, 0), (12, 0)),
                ((13, 0), (14, 0)),
                ((15, 0), (16, 0)),
            ],
        )
        .unwrap();
    let intern = p.add_resource(None, "intern", "Slow Learner").unwrap();
    p.resource_mut(intern)
        .set_working_hours(swiss_cheese);
    p.resource_mut(intern).set_efficiency(0.5).unwrap();

    let ordeal = p.add_task(None, "ordeal", "The Long Haul").unwrap();
    let part1 = p.add_task(Some(ordeal), "part1", "Hard Work").unwrap();
    p.task_mut(part1)
        .set_effort(hours(1.5))
        .set_start(date(2025, 11, 3, 9, 0))
        .allocate("intern");

    assert!(p.schedule());
    // 1.5h of effort at half speed is 3h of presence: the 09, 11 and 13
    // o'clock fragments.
    assert_eq!(p.task(part1).start(0), Some(date(2025, 11, 3, 9, 0)));
    assert_eq!(p.task(part1).end(0), Some(date(2025, 11, 3, 14, 0)));
}

#[test]
fn handoff_waits_for_the_successors_work_week() {
    let mut p = project(date(2025, 11, 3, 0, 0), date(2025, 11, 17, 0, 0));

    let intern = p.add_resource(None, "intern", "Intern").unwrap();
    p.resource_mut(intern).set_efficiency(0.5).unwrap();

    let mut tue_sat = WeeklyPattern::empty();
    tue_sat
        .set_hours(&weekdays(Weekday::Tue, Weekday::Sat), &[((9, 0), (17, 0))])
        .unwrap();
    let admin = p.add_resource(None, "admin", "Admin").unwrap();
    p.resource_mut(admin).set_working_hours(tue_sat);

    let migration = p.add_task(None, "migration", "Migration").unwrap();
    let prep = p.add_task(Some(migration), "prep", "Prepare").unwrap();
    p.task_mut(prep)
        .set_effort(hours(16.0))
        .set_start(date(2025, 11, 3, 9, 0))
        .allocate("intern");
    let deploy = p.add_task(Some(migration), "deploy", "Deploy").unwrap();
    p.task_mut(deploy)
        .set_effort(hours(16.0))
        .add_depends(DependencySpec::new("prep"))
        .allocate("admin");

    assert!(p.schedule());

    // 16h at half speed fills Mon through Thu.
    assert_eq!(p.task(prep).end(0), Some(date(2025, 11, 6, 17, 0)));

    // Ready Thu evening, but the admin's week is Tue-Sat: Fri + Sat.
    assert_eq!(p.task(deploy).start(0), Some(date(2025, 11, 7, 9, 0)));
    assert_eq!(p.task(deploy).end(0), Some(date(2025, 11, 8, 17, 0)));
}

#[test]
fn effort_accounts_work_not_presence() {
    let mut p = project(date(2025, 11, 3, 0, 0), date(2025, 11, 10, 0, 0));
    let intern = p.add_resource(None, "intern", "Intern").unwrap();
    p.resource_mut(intern).set_efficiency(0.5).unwrap();

    let t = p.add_task(None, "t", "Task").unwrap();
    p.task_mut(t)
        .set_effort(hours(4.0))
        .set_start(date(2025, 11, 3, 9, 0))
        .allocate("intern");

    assert!(p.schedule());
    // Eight booked slots, four hours of effort credited.
    assert_eq!(p.task(t).end(0), Some(date(2025, 11, 3, 17, 0)));
    assert!((p.task(t).effort_done(0) - hours(4.0) as f64).abs() < 1e-6);
}
