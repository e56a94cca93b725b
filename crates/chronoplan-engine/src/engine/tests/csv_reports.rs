//! The CSV contract: leaf rows in declaration order, dotted ids, timestamp
//! formatting, cost pricing, and the parse round-trip.

use super::util::{date, project};
use crate::model::DependencySpec;
use crate::report::{Column, CsvTable, TaskReport};
use crate::hours;

#[test]
fn report_lists_leaves_in_declaration_order_with_dotted_ids() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 15, 0, 0));
    p.add_resource(None, "dev", "Dev").unwrap();

    let phase = p.add_task(None, "phase", "Phase").unwrap();
    let a = p.add_task(Some(phase), "a", "A").unwrap();
    p.task_mut(a)
        .set_effort(hours(8.0))
        .set_start(date(2025, 9, 1, 9, 0))
        .allocate("dev");
    let b = p.add_task(Some(phase), "b", "B").unwrap();
    p.task_mut(b)
        .set_effort(hours(8.0))
        .add_depends(DependencySpec::new("a"))
        .allocate("dev");

    assert!(p.schedule());
    let csv = TaskReport::new().to_csv(&p);
    let table = CsvTable::parse(&csv).unwrap();

    assert_eq!(table.header, vec!["id", "start", "end"]);
    assert_eq!(table.len(), 2);
    assert_eq!(table.rows[0][0], "phase.a");
    assert_eq!(table.rows[1][0], "phase.b");
    assert_eq!(table.get("phase.a", "start"), Some("2025-09-01-09:00"));
    assert_eq!(table.get("phase.b", "end"), Some("2025-09-02-17:00"));
}

#[test]
fn parsed_timestamps_round_trip_for_every_task() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 15, 0, 0));
    p.add_resource(None, "dev", "Dev").unwrap();
    let root = p.add_task(None, "r", "Root").unwrap();
    for i in 0..4 {
        let t = p
            .add_task(Some(root), format!("t{i}"), format!("T{i}"))
            .unwrap();
        p.task_mut(t)
            .set_effort(hours(4.0 * (i + 1) as f64))
            .set_start(date(2025, 9, 1, 9, 0))
            .allocate("dev");
    }
    assert!(p.schedule());

    let fmt = "%Y-%m-%d-%H:%M";
    let csv = TaskReport::new().to_csv(&p);
    let table = CsvTable::parse(&csv).unwrap();
    for (_, task) in p.tasks() {
        if !task.is_leaf() {
            continue;
        }
        let start = task.start(0).unwrap().format(fmt).to_string();
        let end = task.end(0).unwrap().format(fmt).to_string();
        assert_eq!(table.get(task.full_id(), "start"), Some(start.as_str()));
        assert_eq!(table.get(task.full_id(), "end"), Some(end.as_str()));
    }
}

#[test]
fn cost_column_prices_booked_days_at_the_resource_rate() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 15, 0, 0));
    let dev = p.add_resource(None, "dev", "Dev").unwrap();
    p.resource_mut(dev).set_rate(400.0);

    let t = p.add_task(None, "t", "Two Days").unwrap();
    p.task_mut(t)
        .set_effort(hours(16.0))
        .set_start(date(2025, 9, 1, 9, 0))
        .allocate("dev");

    assert!(p.schedule());
    // 16 booked hours at 8h/day and 400 a day.
    assert!((p.task_cost(t, 0) - 800.0).abs() < 1e-9);

    let csv = TaskReport::new()
        .with_columns(vec![Column::Id, Column::Start, Column::End, Column::Cost])
        .to_csv(&p);
    let table = CsvTable::parse(&csv).unwrap();
    let cost: f64 = table.get("t", "cost").unwrap().parse().unwrap();
    assert!((cost - 800.0).abs() < 1e-6);
}

#[test]
fn custom_timeformat_applies_to_both_endpoints() {
    let mut p = project(date(2025, 9, 1, 0, 0), date(2025, 9, 15, 0, 0));
    p.add_resource(None, "dev", "Dev").unwrap();
    let t = p.add_task(None, "t", "Task").unwrap();
    p.task_mut(t)
        .set_effort(hours(8.0))
        .set_start(date(2025, 9, 1, 9, 0))
        .allocate("dev");
    assert!(p.schedule());

    let csv = TaskReport::new()
        .with_timeformat("%Y/%m/%d %H:%M")
        .to_csv(&p);
    let table = CsvTable::parse(&csv).unwrap();
    assert_eq!(table.get("t", "start"), Some("2025/09/01 09:00"));
    assert_eq!(table.get("t", "end"), Some("2025/09/01 17:00"));
}
