//! The prepare pass: reset scenario state, resolve references, validate the
//! dependency and manager graphs, compute criticalness, replay tracking
//! bookings.

use crate::limits::Limits;
use crate::model::dependency::DepEdge;
use crate::model::{Project, ResourceId, ScheduleMode, TaskId};
use crate::scoreboard::cell;
use super::EFFORT_EPSILON;
use chronoplan_common::Severity;
use smallvec::SmallVec;
use tracing::trace;

impl Project {
    pub(crate) fn prepare_scenario(&mut self, scenario: usize) {
        self.reset_scenario_state(scenario);
        self.infer_modes(scenario);
        self.resolve_dependencies(scenario);
        self.detect_dependency_loops(scenario);
        self.resolve_managers(scenario);
        self.resolve_allocations(scenario);
        self.warm_scoreboards(scenario);
        self.compute_criticalness(scenario);
        self.replay_tracked_bookings(scenario);
    }

    fn reset_scenario_state(&mut self, scenario: usize) {
        let interval = self.interval();
        let granularity = self.granularity();
        let policy = self.month_policy;
        for idx in 0..self.task_count() {
            let task = self.task_mut(TaskId::new(idx as u32));
            let data = task.data_mut(scenario);
            data.reset_schedule_state();
            data.limits = Limits::materialize(&data.limit_specs, interval, granularity, policy);
        }
        for idx in 0..self.resource_count() {
            let rid = ResourceId::new(idx as u32);
            let specs = self.resource(rid).limit_specs.clone();
            let data = &mut self.resource_mut(rid).data[scenario];
            data.reset_schedule_state();
            data.limits = Limits::materialize(&specs, interval, granularity, policy);
        }
    }

    /// Infer each leaf's scheduling mode and direction from its inputs.
    fn infer_modes(&mut self, scenario: usize) {
        for idx in 0..self.task_count() {
            let tid = TaskId::new(idx as u32);
            if !self.task(tid).is_leaf() {
                continue;
            }
            let full_id = self.task(tid).full_id().to_string();
            let data = self.task_mut(tid).data_mut(scenario);

            let categories = data.declared_categories();
            if categories.len() > 1 {
                let text = format!(
                    "task mixes duration categories: {}",
                    categories.join(" and ")
                );
                self.messages.emit(
                    Severity::Error,
                    "conflicting_duration_spec",
                    text,
                    Some(full_id),
                    Some(scenario),
                );
                continue;
            }

            let data = self.task_mut(tid).data_mut(scenario);
            data.mode = if data.milestone {
                ScheduleMode::Milestone
            } else if data.effort.is_some() {
                ScheduleMode::Effort
            } else if data.length.is_some() {
                ScheduleMode::Length
            } else if data.duration.is_some() {
                ScheduleMode::Duration
            } else if data.start.is_some() && data.end.is_some() {
                ScheduleMode::StartEnd
            } else {
                // No duration category and at most one endpoint: a milestone
                // pinned to whatever anchor becomes known.
                ScheduleMode::Milestone
            };

            // ALAP when anchored on an end date, or when the task has only
            // successors to hang from. Everything else runs forward.
            data.effective_forward = data.forward.unwrap_or_else(|| {
                if data.start.is_some() {
                    true
                } else if data.end.is_some() {
                    false
                } else {
                    !(data.depends.is_empty() && !data.precedes.is_empty())
                }
            });
        }
    }

    /// Resolve dependency references and mirror each edge onto the other
    /// endpoint so both directions see the full constraint set.
    fn resolve_dependencies(&mut self, scenario: usize) {
        for idx in 0..self.task_count() {
            let tid = TaskId::new(idx as u32);
            let declared_depends = self.task(tid).data(scenario).depends.clone();
            let declared_precedes = self.task(tid).data(scenario).precedes.clone();
            let full_id = self.task(tid).full_id().to_string();

            for spec in &declared_depends {
                let Some(target) = self.resolve_task_ref(tid, &spec.task) else {
                    self.messages.emit(
                        Severity::Error,
                        "unknown_dependency",
                        format!("'{}' does not name a known task", spec.task),
                        Some(full_id.clone()),
                        Some(scenario),
                    );
                    continue;
                };
                let on_end = spec.on_end.unwrap_or(true);
                self.task_mut(tid)
                    .data_mut(scenario)
                    .resolved_depends
                    .push(DepEdge {
                        target,
                        gap: spec.gap,
                        gap_mode: spec.gap_mode,
                        on_end,
                        bounding: true,
                    });
                // Mirror: the predecessor must finish before our start, which
                // bounds its end only when the reference point was its end.
                self.task_mut(target)
                    .data_mut(scenario)
                    .resolved_precedes
                    .push(DepEdge {
                        target: tid,
                        gap: spec.gap,
                        gap_mode: spec.gap_mode,
                        on_end: false,
                        bounding: on_end,
                    });
            }

            for spec in &declared_precedes {
                let Some(target) = self.resolve_task_ref(tid, &spec.task) else {
                    self.messages.emit(
                        Severity::Error,
                        "unknown_dependency",
                        format!("'{}' does not name a known task", spec.task),
                        Some(full_id.clone()),
                        Some(scenario),
                    );
                    continue;
                };
                let on_end = spec.on_end.unwrap_or(false);
                self.task_mut(tid)
                    .data_mut(scenario)
                    .resolved_precedes
                    .push(DepEdge {
                        target,
                        gap: spec.gap,
                        gap_mode: spec.gap_mode,
                        on_end,
                        bounding: true,
                    });
                self.task_mut(target)
                    .data_mut(scenario)
                    .resolved_depends
                    .push(DepEdge {
                        target: tid,
                        gap: spec.gap,
                        gap_mode: spec.gap_mode,
                        on_end: true,
                        bounding: !on_end,
                    });
            }
        }
    }

    /// Depth-first search over predecessor edges; a grey-grey edge is a
    /// cycle. Members are marked unschedulable and the scenario fails.
    fn detect_dependency_loops(&mut self, scenario: usize) {
        const WHITE: u8 = 0;
        const GREY: u8 = 1;
        const BLACK: u8 = 2;

        let count = self.task_count();
        let mut color = vec![WHITE; count];
        let mut loop_members: Vec<TaskId> = Vec::new();

        // Iterative DFS; the stack doubles as the grey path so a detected
        // cycle can be reported with its members.
        for root in 0..count {
            if color[root] != WHITE {
                continue;
            }
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            color[root] = GREY;
            while let Some(&(node, edge)) = stack.last() {
                let preds: Vec<usize> = self
                    .task(TaskId::new(node as u32))
                    .data(scenario)
                    .resolved_depends
                    .iter()
                    .map(|e| e.target.as_index())
                    .collect();
                if edge < preds.len() {
                    stack.last_mut().expect("stack is non-empty").1 += 1;
                    let next = preds[edge];
                    match color[next] {
                        WHITE => {
                            color[next] = GREY;
                            stack.push((next, 0));
                        }
                        GREY => {
                            let from = stack.iter().position(|&(n, _)| n == next).unwrap_or(0);
                            for &(member, _) in &stack[from..] {
                                loop_members.push(TaskId::new(member as u32));
                            }
                        }
                        _ => {}
                    }
                } else {
                    color[node] = BLACK;
                    stack.pop();
                }
            }
        }

        if loop_members.is_empty() {
            return;
        }
        loop_members.sort_unstable();
        loop_members.dedup();
        let names: Vec<&str> = loop_members
            .iter()
            .map(|&t| self.task(t).full_id())
            .collect();
        let text = format!("dependency loop through {}", names.join(" -> "));
        self.messages.emit(
            Severity::Error,
            "dependency_loop",
            text,
            None,
            Some(scenario),
        );
        for t in loop_members {
            self.task_mut(t).data_mut(scenario).in_dependency_loop = true;
        }
    }

    fn resolve_managers(&mut self, scenario: usize) {
        for idx in 0..self.resource_count() {
            let rid = ResourceId::new(idx as u32);
            let full_id = self.resource(rid).full_id().to_string();
            let refs = self.resource(rid).managers.clone();
            for reference in refs {
                let Some(manager) = self.resolve_resource_ref(&reference) else {
                    self.messages.emit(
                        Severity::Error,
                        "resource_id_expected",
                        format!("'{reference}' is not a defined resource"),
                        Some(full_id.clone()),
                        Some(scenario),
                    );
                    continue;
                };
                if !self.resource(manager).is_leaf() {
                    self.messages.emit(
                        Severity::Error,
                        "manager_is_group",
                        format!(
                            "group {} cannot be assigned as manager",
                            self.resource(manager).full_id()
                        ),
                        Some(full_id.clone()),
                        Some(scenario),
                    );
                    continue;
                }
                if manager == rid {
                    self.messages.emit(
                        Severity::Error,
                        "manager_is_self",
                        "a resource cannot manage itself".to_string(),
                        Some(full_id.clone()),
                        Some(scenario),
                    );
                    continue;
                }
                let data = &mut self.resource_mut(rid).data[scenario];
                if !data.managers.contains(&manager) {
                    data.managers.push(manager);
                }
                let mdata = &mut self.resource_mut(manager).data[scenario];
                if !mdata.reports.contains(&rid) {
                    mdata.reports.push(rid);
                }
            }
        }

        // A resource reachable from itself over manager edges is a loop.
        for idx in 0..self.resource_count() {
            let start = ResourceId::new(idx as u32);
            let mut seen: Vec<ResourceId> = Vec::new();
            let mut frontier = self.resource(start).data[scenario].managers.clone();
            while let Some(next) = frontier.pop() {
                if next == start {
                    self.messages.emit(
                        Severity::Error,
                        "manager_loop",
                        format!(
                            "management loop through {}",
                            self.resource(start).full_id()
                        ),
                        Some(self.resource(start).full_id().to_string()),
                        Some(scenario),
                    );
                    break;
                }
                if seen.contains(&next) {
                    continue;
                }
                seen.push(next);
                frontier.extend(self.resource(next).data[scenario].managers.iter().copied());
            }
        }
    }

    /// Resolve allocation candidates, expanding groups to their leaves.
    fn resolve_allocations(&mut self, scenario: usize) {
        for idx in 0..self.task_count() {
            let tid = TaskId::new(idx as u32);
            let full_id = self.task(tid).full_id().to_string();
            let alloc_count = self.task(tid).data(scenario).allocations.len();
            for a_idx in 0..alloc_count {
                let candidates =
                    self.task(tid).data(scenario).allocations[a_idx].candidates.clone();
                let mut resolved: SmallVec<[ResourceId; 4]> = SmallVec::new();
                for reference in &candidates {
                    let Some(rid) = self.resolve_resource_ref(reference) else {
                        self.messages.emit(
                            Severity::Error,
                            "resource_id_expected",
                            format!("'{reference}' is not a defined resource"),
                            Some(full_id.clone()),
                            Some(scenario),
                        );
                        continue;
                    };
                    for leaf in self.leaf_resources(rid) {
                        if !resolved.contains(&leaf) {
                            resolved.push(leaf);
                        }
                    }
                }
                self.task_mut(tid).data_mut(scenario).allocations[a_idx].resolved = resolved;
            }
        }
    }

    fn warm_scoreboards(&mut self, scenario: usize) {
        for idx in 0..self.resource_count() {
            let rid = ResourceId::new(idx as u32);
            if self.resource(rid).is_leaf() {
                self.ensure_scoreboard(rid, scenario);
            }
        }
    }

    /// Resource criticalness is demanded work over free working time; a
    /// task's criticalness averages its candidates; path criticalness is the
    /// heaviest dependency path through the task.
    fn compute_criticalness(&mut self, scenario: usize) {
        let granularity = self.granularity() as f64;

        // Spread each effort task's demand evenly over its candidates.
        for idx in 0..self.task_count() {
            let tid = TaskId::new(idx as u32);
            let data = self.task(tid).data(scenario);
            let Some(effort) = data.effort else { continue };
            let shares: Vec<(ResourceId, f64)> = data
                .allocations
                .iter()
                .filter(|a| !a.resolved.is_empty())
                .flat_map(|a| {
                    let share = effort as f64 / a.resolved.len() as f64;
                    a.resolved.iter().map(move |&r| (r, share))
                })
                .collect();
            for (rid, share) in shares {
                self.resource_mut(rid).data[scenario].alloc_demand += share;
            }
        }

        for idx in 0..self.resource_count() {
            let rid = ResourceId::new(idx as u32);
            if !self.resource(rid).is_leaf() {
                continue;
            }
            let free_slots = self.resource(rid).data[scenario]
                .scoreboard
                .as_ref()
                .map_or(0, |sb| sb.iter().filter(|&c| cell::is_available(c)).count());
            let data = &mut self.resource_mut(rid).data[scenario];
            data.criticalness = if free_slots == 0 {
                if data.alloc_demand > EFFORT_EPSILON {
                    1.0
                } else {
                    0.0
                }
            } else {
                data.alloc_demand / (free_slots as f64 * granularity)
            };
            trace!(
                resource = self.resource(rid).full_id(),
                criticalness = self.resource(rid).data[scenario].criticalness,
                "resource criticalness"
            );
        }

        for idx in 0..self.task_count() {
            let tid = TaskId::new(idx as u32);
            let per_allocation: Vec<f64> = self
                .task(tid)
                .data(scenario)
                .allocations
                .iter()
                .filter(|a| !a.resolved.is_empty())
                .map(|a| {
                    a.resolved
                        .iter()
                        .map(|&r| self.resource(r).data[scenario].criticalness)
                        .sum::<f64>()
                        / a.resolved.len() as f64
                })
                .collect();
            let criticalness = if per_allocation.is_empty() {
                0.0
            } else {
                per_allocation.iter().sum::<f64>() / per_allocation.len() as f64
            };
            self.task_mut(tid).data_mut(scenario).criticalness = criticalness;
        }

        self.compute_path_criticalness(scenario);
    }

    /// Forward and backward max-weight sweep over the dependency DAG.
    fn compute_path_criticalness(&mut self, scenario: usize) {
        let count = self.task_count();
        let order = self.topological_order(scenario);

        let mut forward = vec![0.0f64; count];
        for &node in &order {
            let crit = self.task(TaskId::new(node as u32)).data(scenario).criticalness;
            let best_pred = self
                .task(TaskId::new(node as u32))
                .data(scenario)
                .resolved_depends
                .iter()
                .map(|e| forward[e.target.as_index()])
                .fold(0.0f64, f64::max);
            forward[node] = crit + best_pred;
        }

        let mut backward = vec![0.0f64; count];
        for &node in order.iter().rev() {
            let crit = self.task(TaskId::new(node as u32)).data(scenario).criticalness;
            let best_succ = self
                .task(TaskId::new(node as u32))
                .data(scenario)
                .resolved_precedes
                .iter()
                .map(|e| backward[e.target.as_index()])
                .fold(0.0f64, f64::max);
            backward[node] = crit + best_succ;
        }

        for node in 0..count {
            let tid = TaskId::new(node as u32);
            let crit = self.task(tid).data(scenario).criticalness;
            self.task_mut(tid).data_mut(scenario).path_criticalness =
                forward[node] + backward[node] - crit;
        }
    }

    /// Kahn ordering over predecessor edges; loop members (already reported)
    /// are appended at the end so the sweep still terminates.
    fn topological_order(&self, scenario: usize) -> Vec<usize> {
        let count = self.task_count();
        let mut indegree = vec![0usize; count];
        for node in 0..count {
            indegree[node] = self
                .task(TaskId::new(node as u32))
                .data(scenario)
                .resolved_depends
                .len();
        }
        let mut queue: Vec<usize> = (0..count).filter(|&n| indegree[n] == 0).collect();
        let mut order = Vec::with_capacity(count);
        let mut head = 0;
        while head < queue.len() {
            let node = queue[head];
            head += 1;
            order.push(node);
            for edge in &self
                .task(TaskId::new(node as u32))
                .data(scenario)
                .resolved_precedes
            {
                let succ = edge.target.as_index();
                // Mirrors make precedes the exact successor list.
                indegree[succ] = indegree[succ].saturating_sub(1);
                if indegree[succ] == 0 {
                    queue.push(succ);
                }
            }
        }
        for node in 0..count {
            if !order.contains(&node) {
                order.push(node);
            }
        }
        order
    }

    /// Pre-book supplied bookings with force; the tracking scenario is the
    /// source when one is configured.
    fn replay_tracked_bookings(&mut self, scenario: usize) {
        let source = self.tracking_scenario().unwrap_or(scenario);
        for idx in 0..self.task_count() {
            let tid = TaskId::new(idx as u32);
            let supplied = self.task(tid).data(source).supplied_bookings.clone();
            if supplied.is_empty() {
                continue;
            }
            let full_id = self.task(tid).full_id().to_string();
            for (reference, interval) in supplied {
                let Some(rid) = self.resolve_resource_ref(&reference) else {
                    self.messages.emit(
                        Severity::Error,
                        "resource_id_expected",
                        format!("'{reference}' is not a defined resource"),
                        Some(full_id.clone()),
                        Some(scenario),
                    );
                    continue;
                };
                self.ensure_scoreboard(rid, scenario);
                let lo = self.date_to_idx(interval.start).max(0);
                let hi = self
                    .date_to_idx(interval.end)
                    .min(self.end_slot());
                for slot in lo..hi {
                    let already_booked = self.resource(rid).data[scenario]
                        .scoreboard
                        .as_ref()
                        .is_some_and(|sb| cell::is_booked(sb.get(slot as usize)));
                    if already_booked {
                        continue;
                    }
                    let receipt = self.commit_booking(rid, scenario, slot as usize, tid);
                    self.finalize_booking(scenario, tid, &receipt);
                }
            }
        }
    }
}
