//! Per-slot resource booking: candidate ordering by selection mode,
//! limit-checked tentative commits, and the all-or-nothing revert that keeps
//! multi-allocation slots atomic.

use crate::model::project::BookingReceipt;
use crate::model::{Project, ResourceId, SelectionMode, TaskId};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use smallvec::SmallVec;

impl Project {
    /// Try to book one resource per allocation of `tid` in `slot`.
    ///
    /// A mandatory allocation that finds no bookable candidate loses the
    /// whole slot: every tentative booking is reverted and nothing advances.
    /// Returns true when at least one booking was committed.
    pub(crate) fn book_resources_for_slot(
        &mut self,
        tid: TaskId,
        scenario: usize,
        slot: usize,
        rng: &mut SmallRng,
    ) -> bool {
        let alloc_count = self.task(tid).data(scenario).allocations.len();
        if alloc_count == 0 {
            return false;
        }
        let at = self.idx_to_date(slot);

        let mut receipts: SmallVec<[(usize, BookingReceipt); 4]> = SmallVec::new();
        let mut slot_lost = false;

        for a_idx in 0..alloc_count {
            let (mandatory, atomic, persistent, shift) = {
                let a = &self.task(tid).data(scenario).allocations[a_idx];
                (a.mandatory, a.atomic, a.persistent, a.shift)
            };

            // An allocation windowed to a shift only books on-shift slots.
            let shift_active = shift.map_or(true, |sid| {
                self.shift(sid).pattern.on_shift(self.timezone, at)
            });

            let mut picked: Option<ResourceId> = None;
            if shift_active {
                let order = self.candidate_order(tid, scenario, a_idx, rng);
                picked = order
                    .into_iter()
                    .find(|&rid| self.resource_bookable(rid, scenario, slot, tid));
            }

            match picked {
                Some(rid) => {
                    let receipt = self.commit_booking(rid, scenario, slot, tid);
                    receipts.push((a_idx, receipt));
                }
                None => {
                    if mandatory || atomic {
                        slot_lost = true;
                        break;
                    }
                }
            }
        }

        if slot_lost {
            for (_, receipt) in receipts.iter().rev() {
                self.revert_booking(scenario, tid, receipt);
            }
            return false;
        }

        for (a_idx, receipt) in &receipts {
            self.finalize_booking(scenario, tid, receipt);
            let allocation = &mut self.task_mut(tid).data_mut(scenario).allocations[*a_idx];
            if allocation.persistent {
                allocation.locked = Some(receipt.resource);
            }
        }
        !receipts.is_empty()
    }

    /// Candidates of one allocation in the order the selection mode
    /// dictates. Sorts are stable, so declaration order is the final
    /// tie-break; a persistent lock always goes first.
    fn candidate_order(
        &mut self,
        tid: TaskId,
        scenario: usize,
        a_idx: usize,
        rng: &mut SmallRng,
    ) -> SmallVec<[ResourceId; 4]> {
        let (mode, persistent, locked, resolved, cached) = {
            let a = &self.task(tid).data(scenario).allocations[a_idx];
            (
                a.mode,
                a.persistent,
                a.locked,
                a.resolved.clone(),
                a.cached_order.clone(),
            )
        };

        let booked_effort =
            |rid: ResourceId| self.resource(rid).data(scenario).booked_effort;
        let criticalness =
            |rid: ResourceId| self.resource(rid).data(scenario).criticalness;

        let mut order = match mode {
            SelectionMode::Order => resolved,
            SelectionMode::MinAllocated => {
                if persistent {
                    let mut sorted = resolved;
                    sorted.sort_by(|&a, &b| {
                        booked_effort(a)
                            .total_cmp(&booked_effort(b))
                            .then(criticalness(a).total_cmp(&criticalness(b)))
                    });
                    sorted
                } else if let Some(cached) = cached {
                    cached
                } else {
                    let mut sorted = resolved;
                    sorted.sort_by(|&a, &b| criticalness(a).total_cmp(&criticalness(b)));
                    self.task_mut(tid).data_mut(scenario).allocations[a_idx].cached_order =
                        Some(sorted.clone());
                    sorted
                }
            }
            SelectionMode::MinLoaded => {
                let mut sorted = resolved;
                sorted.sort_by(|&a, &b| booked_effort(a).total_cmp(&booked_effort(b)));
                sorted
            }
            SelectionMode::MaxLoaded => {
                let mut sorted = resolved;
                sorted.sort_by(|&a, &b| booked_effort(b).total_cmp(&booked_effort(a)));
                sorted
            }
            SelectionMode::Random => {
                let mut shuffled = resolved;
                shuffled.shuffle(rng);
                shuffled
            }
        };

        // A persistent pick short-circuits whatever the mode decided.
        if let Some(locked) = locked {
            if let Some(pos) = order.iter().position(|&r| r == locked) {
                order.remove(pos);
            }
            order.insert(0, locked);
        }
        order
    }
}
