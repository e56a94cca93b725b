//! The schedule pass: priority-ordered ready-set loop and the slot-by-slot
//! state machine placing one task at a time.

use super::EFFORT_EPSILON;
use crate::model::dependency::GapMode;
use crate::model::{Project, ResourceId, ScheduleMode, TaskId};
use crate::rng::scenario_rng;
use crate::scoreboard::cell;
use chrono::{DateTime, Duration, Utc};
use chronoplan_common::Severity;
use rand::rngs::SmallRng;
use tracing::{debug, warn};

impl Project {
    /// Greedy placement of every unscheduled leaf, highest priority first.
    /// Returns false when any task could not be placed.
    pub(crate) fn schedule_scenario(&mut self, scenario: usize) -> bool {
        let mut rng = scenario_rng(&self.id, scenario);

        self.mark_trivial_milestones(scenario);
        self.update_container_status(scenario);

        let mut pending: Vec<TaskId> = self
            .tasks()
            .filter(|(_, t)| {
                t.is_leaf()
                    && !t.data(scenario).scheduled
                    && !t.data(scenario).in_dependency_loop
            })
            .map(|(id, _)| id)
            .collect();

        pending.sort_by(|&a, &b| {
            let da = self.task(a).data(scenario);
            let db = self.task(b).data(scenario);
            db.priority
                .cmp(&da.priority)
                .then(db.path_criticalness.total_cmp(&da.path_criticalness))
                .then(self.task(a).seqno.cmp(&self.task(b).seqno))
        });

        let mut failed: Vec<TaskId> = Vec::new();
        while !pending.is_empty() {
            let Some(pos) = pending
                .iter()
                .position(|&t| self.ready_for_scheduling(t, scenario))
            else {
                if failed.is_empty() {
                    warn!(remaining = pending.len(), "scheduling deadlock");
                    self.messages.emit(
                        Severity::Warning,
                        "deadlock",
                        format!("{} tasks are waiting on each other", pending.len()),
                        None,
                        Some(scenario),
                    );
                }
                failed.append(&mut pending);
                break;
            };
            let tid = pending.remove(pos);
            if !self.schedule_task(tid, scenario, &mut rng) {
                failed.push(tid);
            }
            self.update_container_status(scenario);
        }

        if !failed.is_empty() {
            self.messages.emit(
                Severity::Warning,
                "unscheduled_tasks",
                format!("{} tasks could not be scheduled", failed.len()),
                None,
                Some(scenario),
            );
            return false;
        }
        true
    }

    /// A leaf with no duration category but a known endpoint collapses to a
    /// zero-width anchor straight away; so does an explicit milestone with a
    /// date.
    fn mark_trivial_milestones(&mut self, scenario: usize) {
        for idx in 0..self.task_count() {
            let tid = TaskId::new(idx as u32);
            if !self.task(tid).is_leaf() {
                continue;
            }
            let data = self.task_mut(tid).data_mut(scenario);
            if data.scheduled || data.mode != ScheduleMode::Milestone {
                continue;
            }
            match (data.start, data.end) {
                (Some(s), None) => data.end = Some(s),
                (None, Some(e)) => data.start = Some(e),
                (None, None) => continue,
                _ => {}
            }
            data.scheduled = true;
        }
    }

    /// Forward tasks wait for their predecessors, ALAP tasks for their
    /// successors; containers count once fully aggregated.
    pub(crate) fn ready_for_scheduling(&self, tid: TaskId, scenario: usize) -> bool {
        let data = self.task(tid).data(scenario);
        let edges = if data.effective_forward {
            &data.resolved_depends
        } else {
            &data.resolved_precedes
        };
        edges
            .iter()
            .all(|e| self.task(e.target).data(scenario).scheduled)
    }

    /// Earliest instant a forward task may start: its anchors, the project
    /// start, and every bounding predecessor reference plus gap.
    fn effective_start(&self, tid: TaskId, scenario: usize) -> DateTime<Utc> {
        let data = self.task(tid).data(scenario);
        let mut effective = self.interval().start;
        if let Some(s) = data.start {
            effective = effective.max(s);
        }
        if let Some(s) = data.min_start {
            effective = effective.max(s);
        }
        for edge in &data.resolved_depends {
            if !edge.bounding {
                continue;
            }
            let target = self.task(edge.target).data(scenario);
            let reference = if edge.on_end { target.end } else { target.start };
            let Some(reference) = reference else { continue };
            effective = effective.max(self.apply_gap(reference, edge.gap, edge.gap_mode, true));
        }
        effective
    }

    /// Latest instant an ALAP task may end, mirrored over successors.
    fn effective_end(&self, tid: TaskId, scenario: usize) -> DateTime<Utc> {
        let data = self.task(tid).data(scenario);
        let mut effective = self.interval().end;
        if let Some(e) = data.end {
            effective = effective.min(e);
        }
        if let Some(e) = data.max_end {
            effective = effective.min(e);
        }
        for edge in &data.resolved_precedes {
            if !edge.bounding {
                continue;
            }
            let target = self.task(edge.target).data(scenario);
            let reference = if edge.on_end { target.end } else { target.start };
            let Some(reference) = reference else { continue };
            effective = effective.min(self.apply_gap(reference, edge.gap, edge.gap_mode, false));
        }
        effective
    }

    fn apply_gap(
        &self,
        from: DateTime<Utc>,
        gap: i64,
        mode: GapMode,
        forward: bool,
    ) -> DateTime<Utc> {
        if gap == 0 {
            return from;
        }
        match mode {
            GapMode::Calendar => {
                if forward {
                    from + Duration::seconds(gap)
                } else {
                    from - Duration::seconds(gap)
                }
            }
            GapMode::Working => self.walk_working_time(from, gap, forward),
        }
    }

    /// Advance (or retreat) over the project default calendar until `gap`
    /// seconds of working time have passed.
    fn walk_working_time(&self, from: DateTime<Utc>, gap: i64, forward: bool) -> DateTime<Utc> {
        let granularity = self.granularity();
        let end = self.end_slot();
        let mut idx = self.date_to_idx(from);
        let mut remaining = gap;
        if forward {
            while remaining > 0 && idx < end {
                let at = self.idx_to_date_i64(idx);
                if self.default_working_hours().on_shift(self.timezone, at) {
                    remaining -= granularity;
                }
                idx += 1;
            }
        } else {
            while remaining > 0 && idx > 0 {
                idx -= 1;
                let at = self.idx_to_date_i64(idx);
                if self.default_working_hours().on_shift(self.timezone, at) {
                    remaining -= granularity;
                }
            }
        }
        self.idx_to_date_i64(idx)
    }

    /// Place one leaf task, stepping slot by slot from its anchor. Returns
    /// false when the cursor left the project interval.
    fn schedule_task(&mut self, tid: TaskId, scenario: usize, rng: &mut SmallRng) -> bool {
        let (forward, mode) = {
            let d = self.task(tid).data(scenario);
            (d.effective_forward, d.mode)
        };
        let anchor = if forward {
            self.effective_start(tid, scenario)
        } else {
            self.effective_end(tid, scenario)
        };
        debug!(
            task = self.task(tid).full_id(),
            mode = mode.as_str(),
            forward,
            %anchor,
            "scheduling task"
        );

        if mode == ScheduleMode::Milestone {
            let data = self.task_mut(tid).data_mut(scenario);
            data.start = Some(anchor);
            data.end = Some(anchor);
            data.scheduled = true;
            return true;
        }

        let granularity = self.granularity();
        let target = {
            let d = self.task(tid).data(scenario);
            match mode {
                ScheduleMode::Effort => d.effort.unwrap_or(0),
                ScheduleMode::Length => d.length.unwrap_or(0),
                ScheduleMode::Duration => d.duration.unwrap_or(0),
                _ => 0,
            }
        };
        if matches!(
            mode,
            ScheduleMode::Effort | ScheduleMode::Length | ScheduleMode::Duration
        ) && target <= 0
        {
            let data = self.task_mut(tid).data_mut(scenario);
            data.start = Some(anchor);
            data.end = Some(anchor);
            data.scheduled = true;
            return true;
        }

        // Fixed endpoints for start-end tasks; the cursor sweeps between
        // them booking whatever is available.
        let (fixed_start_idx, fixed_end_idx) = if mode == ScheduleMode::StartEnd {
            let d = self.task(tid).data(scenario);
            let s = d.start.expect("start-end task has a start");
            let e = d.end.expect("start-end task has an end");
            (self.date_to_idx(s), self.date_to_idx(e))
        } else {
            (0, 0)
        };

        if mode == ScheduleMode::Duration {
            let data = self.task_mut(tid).data_mut(scenario);
            if forward {
                data.start = Some(anchor);
            } else {
                data.end = Some(anchor);
            }
        }

        let end_slot = self.end_slot();
        let delta: i64 = if forward { 1 } else { -1 };
        let mut cursor: i64 = if forward {
            if mode == ScheduleMode::StartEnd {
                fixed_start_idx
            } else {
                self.date_to_idx(anchor)
            }
        } else if mode == ScheduleMode::StartEnd {
            fixed_end_idx - 1
        } else {
            self.date_to_idx(anchor) - 1
        };

        let mut counted_first: Option<usize> = None;
        let mut counted_last: Option<usize> = None;

        loop {
            if cursor < 0 || cursor >= end_slot {
                let full_id = self.task(tid).full_id().to_string();
                let data = self.task_mut(tid).data_mut(scenario);
                data.run_away = true;
                warn!(task = %full_id, "task ran past the project interval");
                self.messages.emit(
                    Severity::Warning,
                    "task_never_completed",
                    "ran out of project time before completion".to_string(),
                    Some(full_id),
                    Some(scenario),
                );
                return false;
            }
            let slot = cursor as usize;

            let done = match mode {
                ScheduleMode::Effort => {
                    self.book_resources_for_slot(tid, scenario, slot, rng);
                    self.task(tid).data(scenario).done_effort + EFFORT_EPSILON >= target as f64
                }
                ScheduleMode::Length => {
                    if self.length_slot_counts(tid, scenario, slot) {
                        self.book_resources_for_slot(tid, scenario, slot, rng);
                        counted_first = Some(counted_first.map_or(slot, |s: usize| s.min(slot)));
                        counted_last = Some(counted_last.map_or(slot, |s: usize| s.max(slot)));
                        let data = self.task_mut(tid).data_mut(scenario);
                        data.done_length += 1;
                        data.done_length * granularity >= target
                    } else {
                        false
                    }
                }
                ScheduleMode::Duration => {
                    self.book_resources_for_slot(tid, scenario, slot, rng);
                    let data = self.task_mut(tid).data_mut(scenario);
                    data.done_duration += 1;
                    data.done_duration * granularity >= target
                }
                ScheduleMode::StartEnd => {
                    let past_span = if forward {
                        cursor >= fixed_end_idx
                    } else {
                        cursor < fixed_start_idx
                    };
                    if past_span {
                        true
                    } else {
                        self.book_resources_for_slot(tid, scenario, slot, rng);
                        if forward {
                            cursor + 1 >= fixed_end_idx
                        } else {
                            cursor <= fixed_start_idx
                        }
                    }
                }
                ScheduleMode::Milestone => unreachable!("milestones return above"),
            };
            if done {
                break;
            }
            cursor += delta;
        }

        // Write the endpoints the mode implies; effort and length snap to
        // the slots that actually advanced the task.
        match mode {
            ScheduleMode::Effort => {
                let (first, last) = {
                    let d = self.task(tid).data(scenario);
                    (d.first_booked_slot, d.last_booked_slot)
                };
                let (start, end) = match (first, last) {
                    (Some(first), Some(last)) => {
                        (self.idx_to_date(first), self.idx_to_date(last + 1))
                    }
                    _ => (anchor, anchor),
                };
                let data = self.task_mut(tid).data_mut(scenario);
                data.start = Some(start);
                data.end = Some(end);
            }
            ScheduleMode::Length => {
                let first = counted_first.expect("length task counted at least one slot");
                let last = counted_last.expect("length task counted at least one slot");
                let start = self.idx_to_date(first);
                let end = self.idx_to_date(last + 1);
                let data = self.task_mut(tid).data_mut(scenario);
                data.start = Some(start);
                data.end = Some(end);
            }
            ScheduleMode::Duration => {
                if forward {
                    let end = self.idx_to_date((cursor + 1) as usize);
                    self.task_mut(tid).data_mut(scenario).end = Some(end);
                } else {
                    let start = self.idx_to_date(cursor as usize);
                    self.task_mut(tid).data_mut(scenario).start = Some(start);
                }
            }
            ScheduleMode::StartEnd => {}
            ScheduleMode::Milestone => unreachable!(),
        }

        self.check_soft_anchors(tid, scenario);
        self.task_mut(tid).data_mut(scenario).scheduled = true;
        true
    }

    /// A slot advances a length task when any allocated candidate is on duty
    /// there; with no allocations the project default calendar decides.
    fn length_slot_counts(&self, tid: TaskId, scenario: usize, slot: usize) -> bool {
        let data = self.task(tid).data(scenario);
        if data.allocations.is_empty() {
            let at = self.idx_to_date(slot);
            return self.default_working_hours().on_shift(self.timezone, at);
        }
        data.allocations
            .iter()
            .flat_map(|a| a.resolved.iter())
            .any(|&rid| self.resource_on_duty(rid, scenario, slot))
    }

    /// On duty = on shift and not on leave; booked slots still count.
    pub(crate) fn resource_on_duty(&self, rid: ResourceId, scenario: usize, slot: usize) -> bool {
        self.resource(rid)
            .data(scenario)
            .scoreboard
            .as_ref()
            .map_or(false, |sb| {
                let c = sb.get(slot);
                cell::is_available(c) || cell::is_booked(c)
            })
    }

    /// Warn when the placed interval breaks a soft anchor (`max_start`,
    /// `min_end`, or the far-side bound the direction could not honor).
    fn check_soft_anchors(&mut self, tid: TaskId, scenario: usize) {
        let (full_id, violation) = {
            let d = self.task(tid).data(scenario);
            let mut violation = None;
            if let (Some(start), Some(limit)) = (d.start, d.max_start) {
                if start > limit {
                    violation = Some(format!("starts {start}, after max start {limit}"));
                }
            }
            if let (Some(end), Some(limit)) = (d.end, d.min_end) {
                if end < limit {
                    violation = Some(format!("ends {end}, before min end {limit}"));
                }
            }
            if let (Some(end), Some(limit)) = (d.end, d.max_end) {
                if d.effective_forward && end > limit {
                    violation = Some(format!("ends {end}, after max end {limit}"));
                }
            }
            if let (Some(start), Some(limit)) = (d.start, d.min_start) {
                if !d.effective_forward && start < limit {
                    violation = Some(format!("starts {start}, before min start {limit}"));
                }
            }
            (self.task(tid).full_id().to_string(), violation)
        };
        if let Some(text) = violation {
            self.messages.emit(
                Severity::Warning,
                "interval_constraint",
                text,
                Some(full_id),
                Some(scenario),
            );
        }
    }

    /// Refresh container envelopes bottom-up; a container is scheduled once
    /// every child is, which in turn unblocks dependencies on it.
    pub(crate) fn update_container_status(&mut self, scenario: usize) {
        let mut containers: Vec<(usize, TaskId)> = self
            .tasks()
            .filter(|(_, t)| !t.is_leaf())
            .map(|(id, t)| {
                let mut depth = 0;
                let mut parent = t.parent;
                while let Some(p) = parent {
                    depth += 1;
                    parent = self.task(p).parent;
                }
                (depth, id)
            })
            .collect();
        containers.sort_by(|a, b| b.0.cmp(&a.0));

        for (_, tid) in containers {
            let children = self.task(tid).children.to_vec();
            let mut min_start: Option<DateTime<Utc>> = None;
            let mut max_end: Option<DateTime<Utc>> = None;
            let mut all_scheduled = true;
            for &child in &children {
                let cd = self.task(child).data(scenario);
                all_scheduled &= cd.scheduled;
                if let Some(s) = cd.start {
                    min_start = Some(min_start.map_or(s, |m: DateTime<Utc>| m.min(s)));
                }
                if let Some(e) = cd.end {
                    max_end = Some(max_end.map_or(e, |m: DateTime<Utc>| m.max(e)));
                }
            }
            let data = self.task_mut(tid).data_mut(scenario);
            if let Some(s) = min_start {
                data.start = Some(s);
            }
            if let Some(e) = max_end {
                data.end = Some(e);
            }
            data.scheduled = all_scheduled;
        }
    }
}
