//! The finish pass: container aggregation checks, duty rollups, minimum
//! limit verification. Results are immutable for the report layer once this
//! pass completes.

use crate::model::{Project, ResourceId, TaskId};
use chronoplan_common::Severity;
use tracing::debug;

impl Project {
    pub(crate) fn finish_scenario(&mut self, scenario: usize) {
        self.update_container_status(scenario);
        self.check_container_bounds(scenario);
        self.roll_up_duties(scenario);
        self.verify_minimum_limits(scenario);
        debug!(scenario, "scenario finished");
    }

    /// Explicit container bounds narrower than the child envelope are a
    /// warning; the aggregated times stand.
    fn check_container_bounds(&mut self, scenario: usize) {
        for idx in 0..self.task_count() {
            let tid = TaskId::new(idx as u32);
            if self.task(tid).is_leaf() {
                continue;
            }
            let (full_id, violation) = {
                let d = self.task(tid).data(scenario);
                let mut violation = None;
                if let (Some(declared), Some(start)) = (d.declared_start, d.start) {
                    if start < declared {
                        violation = Some(format!(
                            "children start {start}, before the declared start {declared}"
                        ));
                    }
                }
                if let (Some(declared), Some(end)) = (d.declared_end, d.end) {
                    if end > declared {
                        violation = Some(format!(
                            "children end {end}, after the declared end {declared}"
                        ));
                    }
                }
                (self.task(tid).full_id().to_string(), violation)
            };
            if let Some(text) = violation {
                self.messages.emit(
                    Severity::Warning,
                    "container_overrun",
                    text,
                    Some(full_id),
                    Some(scenario),
                );
            }
        }
    }

    /// A booking on a leaf task is a duty of every enclosing container, and
    /// of every resource group above the booked leaf resource.
    fn roll_up_duties(&mut self, scenario: usize) {
        for idx in 0..self.resource_count() {
            let rid = ResourceId::new(idx as u32);
            if !self.resource(rid).is_leaf() {
                continue;
            }
            // Ancestor tasks of every duty.
            let mut extended = self.resource(rid).data(scenario).duties.clone();
            let mut cursor = 0;
            while cursor < extended.len() {
                if let Some(parent) = self.task(extended[cursor]).parent() {
                    if !extended.contains(&parent) {
                        extended.push(parent);
                    }
                }
                cursor += 1;
            }
            self.resource_mut(rid).data[scenario].duties = extended.clone();

            // Parent resources inherit the full duty list.
            let mut parent = self.resource(rid).parent();
            while let Some(group) = parent {
                let duties = &mut self.resource_mut(group).data[scenario].duties;
                for &duty in &extended {
                    if !duties.contains(&duty) {
                        duties.push(duty);
                    }
                }
                parent = self.resource(group).parent();
            }
        }
    }

    /// Lower limits are never enforced while booking; report any window that
    /// ended up underfilled.
    fn verify_minimum_limits(&mut self, scenario: usize) {
        for idx in 0..self.resource_count() {
            let rid = ResourceId::new(idx as u32);
            let full_id = self.resource(rid).full_id().to_string();
            let underfilled: usize = self.resource(rid).data[scenario]
                .limits
                .iter()
                .map(|l| l.underfilled_windows().len())
                .sum();
            if underfilled > 0 {
                self.messages.emit(
                    Severity::Info,
                    "limit_violation",
                    format!("{underfilled} periods below the minimum booking limit"),
                    Some(full_id),
                    Some(scenario),
                );
            }
        }
        for idx in 0..self.task_count() {
            let tid = TaskId::new(idx as u32);
            let full_id = self.task(tid).full_id().to_string();
            let underfilled: usize = self.task(tid).data(scenario)
                .limits
                .iter()
                .map(|l| l.underfilled_windows().len())
                .sum();
            if underfilled > 0 {
                self.messages.emit(
                    Severity::Info,
                    "limit_violation",
                    format!("{underfilled} periods below the minimum booking limit"),
                    Some(full_id),
                    Some(scenario),
                );
            }
        }
    }
}
