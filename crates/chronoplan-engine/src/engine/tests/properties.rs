//! Property tests over randomly shaped projects: booked slots are always
//! on-shift and exclusive, and completed effort matches the demand.

use super::util::{date, project};
use crate::model::{DependencySpec, Project, TaskId};
use crate::scoreboard::cell;
use crate::hours;
use proptest::prelude::*;

fn build_project(efforts: &[u8], priorities: &[u16], chain: bool) -> (Project, Vec<TaskId>) {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 12, 1, 0, 0));
    p.add_resource(None, "dev", "Dev").unwrap();

    let mut handles = Vec::new();
    for (i, (&effort, &priority)) in efforts.iter().zip(priorities).enumerate() {
        let t = p
            .add_task(None, format!("t{i}"), format!("Task {i}"))
            .unwrap();
        p.task_mut(t)
            .set_effort(hours(effort as f64))
            .set_priority(priority as i32)
            .allocate("dev");
        if chain && i > 0 {
            p.task_mut(t)
                .add_depends(DependencySpec::new(format!("t{}", i - 1)).gap(hours(1.0)));
        } else {
            p.task_mut(t).set_start(date(2025, 9, 1, 9, 0));
        }
        handles.push(t);
    }
    (p, handles)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn booked_slots_are_on_shift_and_effort_is_satisfied(
        efforts in prop::collection::vec(1u8..16, 1..5),
        chain in any::<bool>(),
    ) {
        let priorities: Vec<u16> = (0..efforts.len() as u16).map(|i| 100 + i * 37).collect();
        let (mut p, handles) = build_project(&efforts, &priorities, chain);
        prop_assert!(p.schedule());

        let dev = p.resource_id("dev").unwrap();
        let sb = p.resource(dev).data(0).scoreboard.as_ref().unwrap();

        // Every booked slot lies on the default working calendar.
        for idx in 0..sb.len() {
            if cell::is_booked(sb.get(idx)) {
                prop_assert!(p.resource_on_shift(dev, sb.idx_to_date(idx)));
            }
        }

        // Each task got exactly its demanded effort booked.
        for (&tid, &effort) in handles.iter().zip(&efforts) {
            let booked = (0..sb.len())
                .filter(|&i| cell::booked_task(sb.get(i)) == Some(tid))
                .count() as i64;
            prop_assert_eq!(booked * 3600, hours(effort as f64));
            prop_assert!(p.task(tid).is_scheduled(0));
        }
    }

    #[test]
    fn chained_tasks_respect_gap_ordering(
        efforts in prop::collection::vec(1u8..10, 2..5),
    ) {
        let priorities: Vec<u16> = vec![500; efforts.len()];
        let (mut p, handles) = build_project(&efforts, &priorities, true);
        prop_assert!(p.schedule());

        for pair in handles.windows(2) {
            let pred_end = p.task(pair[0]).end(0).unwrap();
            let succ_start = p.task(pair[1]).start(0).unwrap();
            prop_assert!(
                succ_start >= pred_end + chrono::Duration::hours(1),
                "gap violated: {} then {}",
                pred_end,
                succ_start
            );
        }
    }
}
