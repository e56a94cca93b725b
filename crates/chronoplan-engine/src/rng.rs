//! Seeded RNG for the `random` allocation selection mode.
//!
//! Runs must be reproducible, so the generator is derived purely from the
//! project id and the scenario sequence number. No ambient entropy is ever
//! consumed during a solve.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Build the per-scenario RNG from `(project id, scenario index)`.
pub fn scenario_rng(project_id: &str, scenario: usize) -> SmallRng {
    let mut hasher = FxHasher::default();
    project_id.hash(&mut hasher);
    scenario.hash(&mut hasher);
    SmallRng::seed_from_u64(hasher.finish())
}
