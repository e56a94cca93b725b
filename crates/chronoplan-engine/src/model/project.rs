use super::resource::Resource;
use super::task::Task;
use super::{ResourceId, Scenario, ShiftId, TaskId};
use crate::calendar::{Leave, Shift, WeeklyPattern};
use crate::limits::MonthPolicy;
use crate::scoreboard::{cell, Scoreboard, SlotIdx};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use chronoplan_common::{MessageLog, SchedulingError, TimeInterval};
use rustc_hash::FxHashMap;

/// Root container: owns the task/resource/shift arenas, the global
/// calendar, the scenario list and the message log.
///
/// All cross-references are integer handles into the arenas; the project is
/// the single owner of every node.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub version: String,

    interval: TimeInterval,
    granularity: i64,
    granularity_frozen: bool,
    pub timezone: Tz,
    pub daily_working_hours: f64,
    /// Default daily rate for resources without their own.
    pub rate: f64,
    pub month_policy: MonthPolicy,
    default_hours: WeeklyPattern,
    leaves: Vec<Leave>,

    scenarios: Vec<Scenario>,
    tracking_scenario: Option<usize>,

    tasks: Vec<Task>,
    resources: Vec<Resource>,
    shifts: Vec<Shift>,
    task_index: FxHashMap<String, TaskId>,
    resource_index: FxHashMap<String, ResourceId>,
    shift_index: FxHashMap<String, ShiftId>,

    pub(crate) messages: MessageLog,
}

impl Project {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, SchedulingError> {
        if end <= start {
            return Err(SchedulingError::EmptyProjectInterval);
        }
        Ok(Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            interval: TimeInterval::new(start, end),
            granularity: 3600,
            granularity_frozen: false,
            timezone: Tz::UTC,
            daily_working_hours: 8.0,
            rate: 0.0,
            month_policy: MonthPolicy::default(),
            default_hours: WeeklyPattern::standard(),
            leaves: Vec::new(),
            scenarios: vec![Scenario::new("plan", "Plan Scenario")],
            tracking_scenario: None,
            tasks: Vec::new(),
            resources: Vec::new(),
            shifts: Vec::new(),
            task_index: FxHashMap::default(),
            resource_index: FxHashMap::default(),
            shift_index: FxHashMap::default(),
            messages: MessageLog::new(),
        })
    }

    // ── configuration ──

    pub fn set_granularity(&mut self, seconds: i64) -> Result<(), SchedulingError> {
        if self.granularity_frozen {
            return Err(SchedulingError::GranularityFrozen);
        }
        if !(60..=86_400).contains(&seconds) {
            return Err(SchedulingError::InvalidGranularity(seconds));
        }
        self.granularity = seconds;
        Ok(())
    }

    pub(crate) fn freeze_granularity(&mut self) {
        self.granularity_frozen = true;
    }

    pub fn set_timezone(&mut self, tz: &str) -> Result<(), SchedulingError> {
        self.timezone = tz
            .parse()
            .map_err(|_| SchedulingError::UnknownTimezone(tz.to_string()))?;
        Ok(())
    }

    /// Replace the project default working hours (Mon-Fri 09:00-17:00 out of
    /// the box).
    pub fn set_default_working_hours(&mut self, pattern: WeeklyPattern) {
        self.default_hours = pattern;
    }

    pub fn default_working_hours(&self) -> &WeeklyPattern {
        &self.default_hours
    }

    pub fn add_leave(&mut self, leave: Leave) {
        self.leaves.push(leave);
    }

    /// Project-wide holiday; every resource is off duty for the interval.
    pub fn add_holiday(&mut self, interval: TimeInterval) {
        self.leaves.push(Leave::holiday(interval));
    }

    pub fn leaves(&self) -> &[Leave] {
        &self.leaves
    }

    /// Add a scenario inheriting its inputs from the first scenario.
    /// Returns the scenario's sequence number.
    pub fn add_scenario(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> usize {
        self.scenarios.push(Scenario::new(id, name));
        for task in &mut self.tasks {
            let inherited = task.data[0].clone();
            task.data.push(inherited);
        }
        for resource in &mut self.resources {
            let inherited = resource.data[0].clone();
            resource.data.push(inherited);
        }
        self.scenarios.len() - 1
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn scenario_mut(&mut self, scenario: usize) -> &mut Scenario {
        &mut self.scenarios[scenario]
    }

    pub fn set_tracking_scenario(&mut self, scenario: usize) {
        self.tracking_scenario = Some(scenario);
    }

    pub(crate) fn tracking_scenario(&self) -> Option<usize> {
        self.tracking_scenario
    }

    // ── arena construction ──

    pub fn add_shift(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        pattern: WeeklyPattern,
    ) -> Result<ShiftId, SchedulingError> {
        let id = id.into();
        if self.shift_index.contains_key(&id) {
            return Err(SchedulingError::DuplicateId {
                kind: "shift",
                id,
            });
        }
        let handle = ShiftId::new(self.shifts.len() as u32);
        self.shift_index.insert(id.clone(), handle);
        self.shifts.push(Shift {
            id,
            name: name.into(),
            pattern,
            leaves: Vec::new(),
        });
        Ok(handle)
    }

    pub fn shift(&self, shift: ShiftId) -> &Shift {
        &self.shifts[shift.as_index()]
    }

    pub fn shift_mut(&mut self, shift: ShiftId) -> &mut Shift {
        &mut self.shifts[shift.as_index()]
    }

    pub fn shift_id(&self, id: &str) -> Option<ShiftId> {
        self.shift_index.get(id).copied()
    }

    pub fn add_task(
        &mut self,
        parent: Option<TaskId>,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<TaskId, SchedulingError> {
        let id = id.into();
        let full_id = match parent {
            Some(p) => format!("{}.{}", self.tasks[p.as_index()].full_id, id),
            None => id.clone(),
        };
        if self.task_index.contains_key(&full_id) {
            return Err(SchedulingError::DuplicateId {
                kind: "task",
                id: full_id,
            });
        }
        let handle = TaskId::new(self.tasks.len() as u32);
        let seqno = self.tasks.len();
        self.task_index.insert(full_id.clone(), handle);
        self.tasks.push(Task::new(
            id,
            full_id,
            name.into(),
            parent,
            seqno,
            self.scenarios.len(),
        ));
        if let Some(p) = parent {
            self.tasks[p.as_index()].children.push(handle);
        }
        Ok(handle)
    }

    pub fn add_resource(
        &mut self,
        parent: Option<ResourceId>,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<ResourceId, SchedulingError> {
        let id = id.into();
        let full_id = match parent {
            Some(p) => format!("{}.{}", self.resources[p.as_index()].full_id, id),
            None => id.clone(),
        };
        if self.resource_index.contains_key(&full_id) {
            return Err(SchedulingError::DuplicateId {
                kind: "resource",
                id: full_id,
            });
        }
        let handle = ResourceId::new(self.resources.len() as u32);
        let seqno = self.resources.len();
        self.resource_index.insert(full_id.clone(), handle);
        self.resources.push(Resource::new(
            id,
            full_id,
            name.into(),
            parent,
            seqno,
            self.scenarios.len(),
        ));
        if let Some(p) = parent {
            self.resources[p.as_index()].children.push(handle);
        }
        Ok(handle)
    }

    // ── lookups ──

    pub fn task(&self, task: TaskId) -> &Task {
        &self.tasks[task.as_index()]
    }

    pub fn task_mut(&mut self, task: TaskId) -> &mut Task {
        &mut self.tasks[task.as_index()]
    }

    pub fn resource(&self, resource: ResourceId) -> &Resource {
        &self.resources[resource.as_index()]
    }

    pub fn resource_mut(&mut self, resource: ResourceId) -> &mut Resource {
        &mut self.resources[resource.as_index()]
    }

    /// Look a task up by its fully qualified dotted id.
    pub fn task_id(&self, full_id: &str) -> Option<TaskId> {
        self.task_index.get(full_id).copied()
    }

    pub fn resource_id(&self, full_id: &str) -> Option<ResourceId> {
        self.resource_index.get(full_id).copied()
    }

    /// All tasks in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = (TaskId, &Task)> {
        self.tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (TaskId::new(i as u32), t))
    }

    pub fn resources(&self) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.resources
            .iter()
            .enumerate()
            .map(|(i, r)| (ResourceId::new(i as u32), r))
    }

    pub(crate) fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    /// Resolve a task reference: fully qualified id, id relative to any
    /// enclosing container of `from`, or globally unique short id.
    pub(crate) fn resolve_task_ref(&self, from: TaskId, reference: &str) -> Option<TaskId> {
        if let Some(&t) = self.task_index.get(reference) {
            return Some(t);
        }
        let mut scope = self.tasks[from.as_index()].parent;
        while let Some(container) = scope {
            let scoped = format!("{}.{}", self.tasks[container.as_index()].full_id, reference);
            if let Some(&t) = self.task_index.get(&scoped) {
                return Some(t);
            }
            scope = self.tasks[container.as_index()].parent;
        }
        let mut found = None;
        for (idx, task) in self.tasks.iter().enumerate() {
            if task.id == reference {
                if found.is_some() {
                    return None;
                }
                found = Some(TaskId::new(idx as u32));
            }
        }
        found
    }

    /// Resolve a resource reference: fully qualified id or globally unique
    /// short id.
    pub(crate) fn resolve_resource_ref(&self, reference: &str) -> Option<ResourceId> {
        if let Some(&r) = self.resource_index.get(reference) {
            return Some(r);
        }
        let mut found = None;
        for (idx, resource) in self.resources.iter().enumerate() {
            if resource.id == reference {
                if found.is_some() {
                    return None;
                }
                found = Some(ResourceId::new(idx as u32));
            }
        }
        found
    }

    /// Leaf descendants of a resource in tree order; a leaf yields itself.
    pub(crate) fn leaf_resources(&self, resource: ResourceId) -> Vec<ResourceId> {
        let node = &self.resources[resource.as_index()];
        if node.is_leaf() {
            return vec![resource];
        }
        let mut out = Vec::new();
        for &child in &node.children {
            out.extend(self.leaf_resources(child));
        }
        out
    }

    // ── slot arithmetic ──

    pub fn interval(&self) -> TimeInterval {
        self.interval
    }

    pub fn granularity(&self) -> i64 {
        self.granularity
    }

    /// Number of scoreboard cells, including the trailing boundary cell.
    pub fn slot_count(&self) -> usize {
        let span = self.interval.seconds();
        ((span + self.granularity - 1) / self.granularity + 1) as usize
    }

    /// Exclusive upper bound of workable slot indices.
    pub(crate) fn end_slot(&self) -> i64 {
        self.slot_count() as i64 - 1
    }

    pub fn idx_to_date(&self, idx: SlotIdx) -> DateTime<Utc> {
        self.interval.start + Duration::seconds(idx as i64 * self.granularity)
    }

    pub(crate) fn idx_to_date_i64(&self, idx: i64) -> DateTime<Utc> {
        self.interval.start + Duration::seconds(idx * self.granularity)
    }

    /// Slot containing `at`; positions outside the project map to negative
    /// or past-the-end indices.
    pub fn date_to_idx(&self, at: DateTime<Utc>) -> i64 {
        (at - self.interval.start)
            .num_seconds()
            .div_euclid(self.granularity)
    }

    // ── merged calendars & scoreboards ──

    /// Is the instant working time for the resource, considering shift
    /// assignments, the resource's own pattern, and the default pattern, in
    /// the resource's timezone? Leaves are not consulted here; they are
    /// overlaid on the scoreboard.
    pub fn resource_on_shift(&self, resource: ResourceId, at: DateTime<Utc>) -> bool {
        let r = &self.resources[resource.as_index()];
        let tz = r.timezone.unwrap_or(self.timezone);
        for assignment in &r.shift_assignments {
            if assignment.window.contains(at) {
                return self.shifts[assignment.shift.as_index()].pattern.on_shift(tz, at);
            }
        }
        match &r.working_hours {
            Some(pattern) => pattern.on_shift(tz, at),
            None => self.default_hours.on_shift(tz, at),
        }
    }

    /// True when a replacing shift assignment covers the instant, which
    /// shields the slot from leave overlays.
    fn leave_replaced(&self, resource: ResourceId, at: DateTime<Utc>) -> bool {
        self.resources[resource.as_index()]
            .shift_assignments
            .iter()
            .any(|a| a.replace && a.window.contains(at))
    }

    /// Build the scenario scoreboard for a leaf resource: mark on-shift
    /// slots available, then overlay project, resource and shift leaves.
    pub(crate) fn build_resource_scoreboard(&self, resource: ResourceId) -> Scoreboard {
        let mut sb = Scoreboard::new(
            self.interval.start,
            self.interval.end,
            self.granularity,
            cell::OFF_DUTY,
        );
        let workable = self.end_slot() as usize;
        for idx in 0..workable {
            if self.resource_on_shift(resource, sb.idx_to_date(idx)) {
                sb.set(idx, cell::AVAILABLE);
            }
        }

        let r = &self.resources[resource.as_index()];
        let overlay = |sb: &mut Scoreboard, leave: &Leave| {
            let lo = sb.date_to_idx(leave.interval.start);
            let hi = sb
                .date_to_idx_unclamped(leave.interval.end)
                .clamp(0, workable as i64) as usize;
            for idx in lo..hi {
                let at = sb.idx_to_date(idx);
                if !leave.interval.contains(at) {
                    continue;
                }
                if self.leave_replaced(resource, at) {
                    continue;
                }
                sb.set(idx, cell::with_leave(sb.get(idx), leave.kind));
            }
        };

        for leave in &self.leaves {
            overlay(&mut sb, leave);
        }
        for leave in &r.leaves {
            overlay(&mut sb, leave);
        }
        for assignment in &r.shift_assignments {
            for leave in &self.shifts[assignment.shift.as_index()].leaves {
                overlay(&mut sb, leave);
            }
        }
        sb
    }

    pub(crate) fn ensure_scoreboard(&mut self, resource: ResourceId, scenario: usize) {
        if self.resources[resource.as_index()].data[scenario]
            .scoreboard
            .is_none()
        {
            let sb = self.build_resource_scoreboard(resource);
            self.resources[resource.as_index()].data[scenario].scoreboard = Some(sb);
        }
    }

    // ── booking primitives ──

    /// Can the leaf resource take a booking for `task` in `slot`?
    pub(crate) fn resource_bookable(
        &self,
        resource: ResourceId,
        scenario: usize,
        slot: SlotIdx,
        task: TaskId,
    ) -> bool {
        let r = &self.resources[resource.as_index()];
        let data = &r.data[scenario];
        let Some(sb) = &data.scoreboard else {
            return false;
        };
        if !cell::is_available(sb.get(slot)) {
            return false;
        }
        if !data.limits.ok(slot, true, Some(resource)) {
            return false;
        }
        self.tasks[task.as_index()].data[scenario]
            .limits
            .ok(slot, true, Some(resource))
    }

    /// Unconditionally mark the slot booked and update every counter.
    /// Callers check [`Project::resource_bookable`] first unless forcing.
    pub(crate) fn commit_booking(
        &mut self,
        resource: ResourceId,
        scenario: usize,
        slot: SlotIdx,
        task: TaskId,
    ) -> BookingReceipt {
        let granularity = self.granularity;
        let r = &mut self.resources[resource.as_index()];
        let efficiency = r.efficiency;
        let data = &mut r.data[scenario];
        data.scoreboard
            .as_mut()
            .expect("scoreboard built before booking")
            .set(slot, cell::booked(task));
        data.booked_slots += 1;
        data.booked_effort += efficiency * granularity as f64;
        data.limits.inc(slot, Some(resource));
        let new_duty = !data.duties.contains(&task);
        if new_duty {
            data.duties.push(task);
        }

        let t = &mut self.tasks[task.as_index()].data[scenario];
        t.limits.inc(slot, Some(resource));
        t.done_effort += efficiency * granularity as f64;
        let new_assignment = !t.assigned.contains(&resource);
        if new_assignment {
            t.assigned.push(resource);
        }

        BookingReceipt {
            resource,
            slot,
            new_duty,
            new_assignment,
            effort: efficiency * granularity as f64,
        }
    }

    /// Record first/last booked slot bookkeeping once a slot's bookings are
    /// final. Kept out of [`Project::commit_booking`] so a reverted slot
    /// never widens a booking span.
    pub(crate) fn finalize_booking(
        &mut self,
        scenario: usize,
        task: TaskId,
        receipt: &BookingReceipt,
    ) {
        self.resources[receipt.resource.as_index()].data[scenario]
            .note_booking(task, receipt.slot);
        let t = &mut self.tasks[task.as_index()].data[scenario];
        t.first_booked_slot = Some(t.first_booked_slot.map_or(receipt.slot, |s| s.min(receipt.slot)));
        t.last_booked_slot = Some(t.last_booked_slot.map_or(receipt.slot, |s| s.max(receipt.slot)));
    }

    /// Reverse a tentative booking made earlier in the same slot.
    pub(crate) fn revert_booking(&mut self, scenario: usize, task: TaskId, receipt: &BookingReceipt) {
        let r = &mut self.resources[receipt.resource.as_index()];
        let data = &mut r.data[scenario];
        data.scoreboard
            .as_mut()
            .expect("scoreboard exists while reverting")
            .set(receipt.slot, cell::AVAILABLE);
        data.booked_slots -= 1;
        data.booked_effort -= receipt.effort;
        data.limits.dec(receipt.slot, Some(receipt.resource));
        if receipt.new_duty {
            data.duties.retain(|&t| t != task);
        }

        let t = &mut self.tasks[task.as_index()].data[scenario];
        t.limits.dec(receipt.slot, Some(receipt.resource));
        t.done_effort -= receipt.effort;
        if receipt.new_assignment {
            t.assigned.retain(|&r| r != receipt.resource);
        }
    }

    // ── reporting queries ──

    /// Slots booked for `task` (or anyone, when `None`) on the resource
    /// subtree within the index range.
    pub fn booked_slots_in(
        &self,
        resource: ResourceId,
        scenario: usize,
        range: (SlotIdx, SlotIdx),
        task: Option<TaskId>,
    ) -> usize {
        let node = &self.resources[resource.as_index()];
        if !node.is_leaf() {
            return node
                .children
                .iter()
                .map(|&c| self.booked_slots_in(c, scenario, range, task))
                .sum();
        }
        let Some(sb) = &node.data[scenario].scoreboard else {
            return 0;
        };
        let hi = range.1.min(sb.len());
        (range.0..hi)
            .filter(|&idx| match cell::booked_task(sb.get(idx)) {
                Some(owner) => task.map_or(true, |t| owner == t),
                None => false,
            })
            .count()
    }

    /// Booked work on the resource subtree in seconds, weighted by
    /// efficiency.
    pub fn effective_work(
        &self,
        resource: ResourceId,
        scenario: usize,
        range: (SlotIdx, SlotIdx),
        task: Option<TaskId>,
    ) -> f64 {
        let node = &self.resources[resource.as_index()];
        if !node.is_leaf() {
            return node
                .children
                .iter()
                .map(|&c| self.effective_work(c, scenario, range, task))
                .sum();
        }
        self.booked_slots_in(resource, scenario, range, task) as f64
            * self.granularity as f64
            * node.efficiency
    }

    /// Cost of a task subtree: booked slots per resource converted to day
    /// loads and priced at the resource (or project) daily rate.
    pub fn task_cost(&self, task: TaskId, scenario: usize) -> f64 {
        let node = &self.tasks[task.as_index()];
        if !node.is_leaf() {
            return node
                .children
                .iter()
                .map(|&c| self.task_cost(c, scenario))
                .sum();
        }
        let full_range = (0, self.slot_count());
        node.data[scenario]
            .assigned
            .iter()
            .map(|&rid| {
                let r = &self.resources[rid.as_index()];
                let slots = self.booked_slots_in(rid, scenario, full_range, Some(task));
                let day_load =
                    slots as f64 * self.granularity as f64 / 3600.0 / self.daily_working_hours;
                day_load * r.rate.unwrap_or(self.rate)
            })
            .sum()
    }

    /// Booking runs of a task on each assigned resource, for reports.
    pub fn task_bookings(
        &self,
        task: TaskId,
        scenario: usize,
    ) -> Vec<(ResourceId, Vec<TimeInterval>)> {
        let node = &self.tasks[task.as_index()];
        node.data[scenario]
            .assigned
            .iter()
            .map(|&rid| {
                let r = &self.resources[rid.as_index()];
                let runs = match &r.data[scenario].scoreboard {
                    Some(sb) => sb.collect_intervals(self.interval, self.granularity, |c| {
                        cell::booked_task(c) == Some(task)
                    }),
                    None => Vec::new(),
                };
                (rid, runs)
            })
            .collect()
    }
}

/// Everything needed to undo one tentative slot booking.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BookingReceipt {
    pub resource: ResourceId,
    pub slot: SlotIdx,
    pub new_duty: bool,
    pub new_assignment: bool,
    pub effort: f64,
}
