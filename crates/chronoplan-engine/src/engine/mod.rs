//! The scheduler driver: prepare -> schedule -> finish per scenario.
//!
//! Scheduling is single-threaded and deterministic; the driver either
//! completes a scenario or records why it could not, and always moves on to
//! the next scenario.

pub mod booking;
pub mod finish;
pub mod prepare;
pub mod schedule;

#[cfg(test)]
mod tests;

use crate::model::Project;
use tracing::debug;

/// Slack for floating-point effort accumulation; one part per million of a
/// second never changes a slot decision.
pub(crate) const EFFORT_EPSILON: f64 = 1e-6;

impl Project {
    /// Solve every active scenario. Returns true when all of them scheduled
    /// without errors; details are in [`Project::messages`].
    pub fn schedule(&mut self) -> bool {
        self.freeze_granularity();
        if self.task_count() == 0 {
            return true;
        }

        let mut all_ok = true;
        for scenario in 0..self.scenarios().len() {
            if !self.scenarios()[scenario].active {
                continue;
            }
            debug!(scenario, "preparing scenario");
            self.prepare_scenario(scenario);
            if self.messages.scenario_has_errors(scenario) {
                all_ok = false;
                continue;
            }
            debug!(scenario, "scheduling scenario");
            let scheduled = self.schedule_scenario(scenario);
            self.finish_scenario(scenario);
            all_ok &= scheduled && !self.messages.scenario_has_errors(scenario);
        }
        all_ok
    }
}
