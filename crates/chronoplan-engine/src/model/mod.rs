//! The project data model: arenas of tasks, resources and shifts addressed
//! by integer handles, plus the per-scenario state the scheduler mutates.

pub mod allocation;
pub mod dependency;
pub mod handles;
pub mod project;
pub mod resource;
pub mod scenario;
pub mod task;

pub use allocation::{Allocation, SelectionMode};
pub use dependency::{DependencySpec, GapMode};
pub use handles::{ResourceId, ShiftId, TaskId};
pub use project::Project;
pub use resource::Resource;
pub use scenario::Scenario;
pub use task::{ScheduleMode, Task};
