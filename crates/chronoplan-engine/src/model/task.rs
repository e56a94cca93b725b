use super::allocation::Allocation;
use super::dependency::{DepEdge, DependencySpec};
use super::{ResourceId, TaskId};
use crate::limits::{Limits, LimitSpec};
use crate::scoreboard::SlotIdx;
use chrono::{DateTime, Utc};
use chronoplan_common::TimeInterval;

/// The duration category a leaf task is scheduled under, inferred once
/// during prepare. Mixing categories is rejected.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleMode {
    /// Zero-width anchor; start and end coincide.
    Milestone = 0,
    /// Seconds of work performed by allocated resources, scaled by efficiency.
    Effort = 1,
    /// Seconds of working time, independent of booking success.
    Length = 2,
    /// Seconds of wall-clock time.
    Duration = 3,
    /// Both endpoints fixed; bookings are solved within.
    #[default]
    StartEnd = 4,
}

impl ScheduleMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleMode::Milestone => "milestone",
            ScheduleMode::Effort => "effort",
            ScheduleMode::Length => "length",
            ScheduleMode::Duration => "duration",
            ScheduleMode::StartEnd => "start-end",
        }
    }
}

/// Per-scenario task attributes and scheduling state.
#[derive(Debug, Clone, Default)]
pub struct TaskData {
    // Inputs.
    pub effort: Option<i64>,
    pub length: Option<i64>,
    pub duration: Option<i64>,
    pub milestone: bool,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub min_start: Option<DateTime<Utc>>,
    pub max_start: Option<DateTime<Utc>>,
    pub min_end: Option<DateTime<Utc>>,
    pub max_end: Option<DateTime<Utc>>,
    /// Scheduling direction; `None` lets prepare infer it from the anchors.
    pub forward: Option<bool>,
    pub priority: i32,
    pub depends: Vec<DependencySpec>,
    pub precedes: Vec<DependencySpec>,
    pub allocations: Vec<Allocation>,
    pub limit_specs: Vec<LimitSpec>,
    /// Pre-existing bookings replayed with force during prepare
    /// (resource reference, interval).
    pub supplied_bookings: Vec<(String, TimeInterval)>,

    // Derived by prepare.
    pub(crate) mode: ScheduleMode,
    pub(crate) effective_forward: bool,
    /// Endpoint inputs as declared, kept for the container-overrun check
    /// after aggregation overwrites `start`/`end`.
    pub(crate) declared_start: Option<DateTime<Utc>>,
    pub(crate) declared_end: Option<DateTime<Utc>>,
    pub(crate) resolved_depends: Vec<DepEdge>,
    pub(crate) resolved_precedes: Vec<DepEdge>,
    pub(crate) criticalness: f64,
    pub(crate) path_criticalness: f64,
    pub(crate) in_dependency_loop: bool,

    // Mutated by the schedule pass.
    pub(crate) scheduled: bool,
    pub(crate) run_away: bool,
    pub(crate) done_effort: f64,
    pub(crate) done_length: i64,
    pub(crate) done_duration: i64,
    pub(crate) limits: Limits,
    pub(crate) assigned: Vec<ResourceId>,
    pub(crate) first_booked_slot: Option<SlotIdx>,
    pub(crate) last_booked_slot: Option<SlotIdx>,
}

impl TaskData {
    pub(crate) fn new() -> Self {
        Self {
            priority: 500,
            mode: ScheduleMode::StartEnd,
            effective_forward: true,
            ..Default::default()
        }
    }

    /// Clear everything the passes derive, keeping the declared inputs.
    pub(crate) fn reset_schedule_state(&mut self) {
        self.mode = ScheduleMode::StartEnd;
        self.effective_forward = true;
        self.declared_start = self.start;
        self.declared_end = self.end;
        self.resolved_depends.clear();
        self.resolved_precedes.clear();
        self.criticalness = 0.0;
        self.path_criticalness = 0.0;
        self.in_dependency_loop = false;
        self.scheduled = false;
        self.run_away = false;
        self.done_effort = 0.0;
        self.done_length = 0;
        self.done_duration = 0;
        self.limits = Limits::default();
        self.assigned.clear();
        self.first_booked_slot = None;
        self.last_booked_slot = None;
        for a in &mut self.allocations {
            a.reset_schedule_state();
        }
    }

    /// The duration categories explicitly set on this task.
    pub(crate) fn declared_categories(&self) -> Vec<&'static str> {
        let mut cats = Vec::new();
        if self.milestone {
            cats.push("milestone");
        }
        if self.effort.is_some() {
            cats.push("effort");
        }
        if self.length.is_some() {
            cats.push("length");
        }
        if self.duration.is_some() {
            cats.push("duration");
        }
        cats
    }
}

/// A node of the task tree. Only leaves are scheduled directly; containers
/// aggregate their children in the finish pass.
#[derive(Debug, Clone)]
pub struct Task {
    pub(crate) id: String,
    pub(crate) full_id: String,
    pub name: String,
    pub(crate) parent: Option<TaskId>,
    pub(crate) children: Vec<TaskId>,
    pub(crate) seqno: usize,
    pub(crate) data: Vec<TaskData>,
}

impl Task {
    pub(crate) fn new(
        id: String,
        full_id: String,
        name: String,
        parent: Option<TaskId>,
        seqno: usize,
        scenarios: usize,
    ) -> Self {
        Self {
            id,
            full_id,
            name,
            parent,
            children: Vec::new(),
            seqno,
            data: vec![TaskData::new(); scenarios],
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fully qualified dotted id (`parent.child`).
    pub fn full_id(&self) -> &str {
        &self.full_id
    }

    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    pub fn children(&self) -> &[TaskId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn data(&self, scenario: usize) -> &TaskData {
        &self.data[scenario]
    }

    pub fn data_mut(&mut self, scenario: usize) -> &mut TaskData {
        &mut self.data[scenario]
    }

    // Input setters broadcast to every scenario slot; scenario-specific
    // overrides go through `data_mut`.

    fn each(&mut self, f: impl Fn(&mut TaskData)) -> &mut Self {
        for d in &mut self.data {
            f(d);
        }
        self
    }

    pub fn set_effort(&mut self, seconds: i64) -> &mut Self {
        self.each(|d| d.effort = Some(seconds))
    }

    pub fn set_length(&mut self, seconds: i64) -> &mut Self {
        self.each(|d| d.length = Some(seconds))
    }

    pub fn set_duration(&mut self, seconds: i64) -> &mut Self {
        self.each(|d| d.duration = Some(seconds))
    }

    pub fn set_milestone(&mut self) -> &mut Self {
        self.each(|d| d.milestone = true)
    }

    pub fn set_start(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.each(|d| d.start = Some(at))
    }

    pub fn set_end(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.each(|d| d.end = Some(at))
    }

    pub fn set_min_start(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.each(|d| d.min_start = Some(at))
    }

    pub fn set_max_start(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.each(|d| d.max_start = Some(at))
    }

    pub fn set_min_end(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.each(|d| d.min_end = Some(at))
    }

    pub fn set_max_end(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.each(|d| d.max_end = Some(at))
    }

    /// Force ASAP (`true`) or ALAP (`false`) scheduling.
    pub fn set_forward(&mut self, forward: bool) -> &mut Self {
        self.each(|d| d.forward = Some(forward))
    }

    pub fn set_priority(&mut self, priority: i32) -> &mut Self {
        self.each(|d| d.priority = priority)
    }

    pub fn add_depends(&mut self, dep: impl Into<DependencySpec>) -> &mut Self {
        let dep = dep.into();
        self.each(|d| d.depends.push(dep.clone()))
    }

    pub fn add_precedes(&mut self, dep: impl Into<DependencySpec>) -> &mut Self {
        let dep = dep.into();
        self.each(|d| d.precedes.push(dep.clone()))
    }

    pub fn add_allocation(&mut self, allocation: Allocation) -> &mut Self {
        self.each(|d| d.allocations.push(allocation.clone()))
    }

    /// Shorthand for a single-candidate, declaration-ordered allocation.
    pub fn allocate(&mut self, resource: impl Into<String>) -> &mut Self {
        self.add_allocation(Allocation::new([resource.into()]))
    }

    pub fn add_limit(&mut self, spec: LimitSpec) -> &mut Self {
        self.each(|d| d.limit_specs.push(spec.clone()))
    }

    pub fn add_booking(&mut self, resource: impl Into<String>, interval: TimeInterval) -> &mut Self {
        let resource = resource.into();
        self.each(|d| d.supplied_bookings.push((resource.clone(), interval)))
    }

    // Scheduling outputs.

    pub fn is_scheduled(&self, scenario: usize) -> bool {
        self.data[scenario].scheduled
    }

    pub fn start(&self, scenario: usize) -> Option<DateTime<Utc>> {
        self.data[scenario].start
    }

    pub fn end(&self, scenario: usize) -> Option<DateTime<Utc>> {
        self.data[scenario].end
    }

    pub fn mode(&self, scenario: usize) -> ScheduleMode {
        self.data[scenario].mode
    }

    pub fn is_run_away(&self, scenario: usize) -> bool {
        self.data[scenario].run_away
    }

    /// Seconds of work booked so far, weighted by resource efficiency.
    pub fn effort_done(&self, scenario: usize) -> f64 {
        self.data[scenario].done_effort
    }

    pub fn assigned_resources(&self, scenario: usize) -> &[ResourceId] {
        &self.data[scenario].assigned
    }

    pub fn criticalness(&self, scenario: usize) -> f64 {
        self.data[scenario].criticalness
    }

    pub fn path_criticalness(&self, scenario: usize) -> f64 {
        self.data[scenario].path_criticalness
    }
}
