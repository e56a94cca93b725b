//! Backward scheduling from a deadline, with a holiday in the middle of the
//! chain. The backward pass has to skip the holiday just like the forward
//! pass would.

use super::util::{date, day_interval, project};
use crate::model::DependencySpec;
use crate::hours;

#[test]
fn alap_chain_respects_holiday() {
    let mut p = project(date(2025, 12, 1, 0, 0), date(2025, 12, 20, 0, 0));
    // Default working hours are Mon-Fri 09:00-17:00.
    p.add_resource(None, "painter", "Painter").unwrap();
    p.add_holiday(day_interval(2025, 12, 10));

    let production = p.add_task(None, "production", "Production").unwrap();
    let step1 = p.add_task(Some(production), "step1", "Assembly").unwrap();
    p.task_mut(step1)
        .set_effort(hours(16.0))
        .add_precedes(DependencySpec::new("step2"))
        .allocate("painter");
    let step2 = p.add_task(Some(production), "step2", "Painting").unwrap();
    p.task_mut(step2)
        .set_effort(hours(16.0))
        .set_end(date(2025, 12, 12, 17, 0))
        .allocate("painter");

    assert!(p.schedule());

    // Anchored on the deadline: Thu Dec 11 + Fri Dec 12.
    assert_eq!(p.task(step2).start(0), Some(date(2025, 12, 11, 9, 0)));
    assert_eq!(p.task(step2).end(0), Some(date(2025, 12, 12, 17, 0)));

    // Pushed back over the Dec 10 holiday: Mon Dec 8 + Tue Dec 9.
    assert_eq!(p.task(step1).start(0), Some(date(2025, 12, 8, 9, 0)));
    assert_eq!(p.task(step1).end(0), Some(date(2025, 12, 9, 17, 0)));
}

#[test]
fn alap_tasks_on_one_machine_stay_sequential() {
    // Just-in-time chain: everything hangs off the packing deadline and the
    // single machine keeps the assemblies from overlapping.
    let mut p = project(date(2025, 7, 7, 0, 0), date(2025, 7, 19, 0, 0));
    let mut hours_8_16 = crate::calendar::WeeklyPattern::empty();
    hours_8_16
        .set_hours(
            &crate::calendar::weekdays(chrono::Weekday::Mon, chrono::Weekday::Fri),
            &[((8, 0), (16, 0))],
        )
        .unwrap();
    p.set_default_working_hours(hours_8_16);
    p.add_resource(None, "machine", "Assembly Machine").unwrap();

    let delivery = p.add_task(None, "delivery", "Delivery").unwrap();
    let pack = p.add_task(Some(delivery), "pack", "Pack").unwrap();
    p.task_mut(pack)
        .set_effort(hours(8.0))
        .set_end(date(2025, 7, 18, 16, 0))
        .allocate("machine");
    let a = p.add_task(Some(delivery), "assemble_a", "Assemble A").unwrap();
    p.task_mut(a)
        .set_effort(hours(16.0))
        .add_precedes(DependencySpec::new("pack"))
        .allocate("machine");
    let b = p.add_task(Some(delivery), "assemble_b", "Assemble B").unwrap();
    p.task_mut(b)
        .set_effort(hours(16.0))
        .add_precedes(DependencySpec::new("pack"))
        .allocate("machine");

    assert!(p.schedule());

    // Pack owns the deadline day.
    assert_eq!(p.task(pack).start(0), Some(date(2025, 7, 18, 8, 0)));
    assert_eq!(p.task(pack).end(0), Some(date(2025, 7, 18, 16, 0)));

    // The assemblies fill the four preceding days without overlapping.
    let (sa, ea) = (p.task(a).start(0).unwrap(), p.task(a).end(0).unwrap());
    let (sb, eb) = (p.task(b).start(0).unwrap(), p.task(b).end(0).unwrap());
    assert!(ea <= sb || eb <= sa, "assemblies overlap: {sa}..{ea} vs {sb}..{eb}");
    assert_eq!(sa.min(sb), date(2025, 7, 14, 8, 0));
    assert_eq!(ea.max(eb), date(2025, 7, 17, 16, 0));
}
