//! Dense per-slot state over the project interval.
//!
//! One `u32` per slot, no per-slot allocations. A cell is either off-duty
//! (optionally tagged with a leave kind for reporting), available, or booked
//! by exactly one leaf task. The scoreboard also owns the slot <-> instant
//! arithmetic for its interval.

use crate::calendar::LeaveKind;
use crate::model::TaskId;
use chrono::{DateTime, Duration, Utc};
use chronoplan_common::TimeInterval;

/// Index of a slot within a scoreboard.
pub type SlotIdx = usize;

/// Packed slot cell.
///
/// Layout (when the booked bit is clear):
///   bit 0      on-duty / available
///   bits 2-5   leave kind tag + 1, zero when no leave covers the slot
/// When bit 31 is set the remaining bits hold the booking task's index.
pub mod cell {
    use super::*;

    pub const OFF_DUTY: u32 = 0;
    pub const AVAILABLE: u32 = 1;

    const BOOKED_BIT: u32 = 0x8000_0000;
    const LEAVE_SHIFT: u32 = 2;
    const LEAVE_MASK: u32 = 0b1111 << LEAVE_SHIFT;

    #[inline]
    pub fn booked(task: TaskId) -> u32 {
        BOOKED_BIT | task.as_index() as u32
    }

    #[inline]
    pub fn is_booked(cell: u32) -> bool {
        cell & BOOKED_BIT != 0
    }

    #[inline]
    pub fn booked_task(cell: u32) -> Option<TaskId> {
        if is_booked(cell) {
            Some(TaskId::new(cell & !BOOKED_BIT))
        } else {
            None
        }
    }

    #[inline]
    pub fn is_available(cell: u32) -> bool {
        cell == AVAILABLE
    }

    /// Overlay a leave on a non-booked cell; the higher kind wins and the
    /// cell goes off duty.
    pub fn with_leave(cell: u32, kind: LeaveKind) -> u32 {
        debug_assert!(!is_booked(cell));
        let tag = kind.to_tag() as u32 + 1;
        let current = (cell & LEAVE_MASK) >> LEAVE_SHIFT;
        if tag > current {
            (cell & !(LEAVE_MASK | AVAILABLE)) | (tag << LEAVE_SHIFT)
        } else {
            cell & !AVAILABLE
        }
    }

    /// The leave kind recorded on an off-duty cell, if any.
    pub fn leave_kind(cell: u32) -> Option<LeaveKind> {
        if is_booked(cell) {
            return None;
        }
        let tag = (cell & LEAVE_MASK) >> LEAVE_SHIFT;
        if tag == 0 {
            None
        } else {
            Some(LeaveKind::from_tag(tag as u8 - 1))
        }
    }
}

/// Fixed-size slot vector covering `[start, end)` at `granularity` seconds
/// per slot. The vector has one extra trailing cell so that `end` itself
/// maps to a valid index.
#[derive(Debug, Clone)]
pub struct Scoreboard {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    granularity: i64,
    cells: Vec<u32>,
}

impl Scoreboard {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, granularity: i64, init: u32) -> Self {
        debug_assert!(end > start && granularity > 0);
        let span = (end - start).num_seconds();
        let size = (span + granularity - 1) / granularity + 1;
        Self {
            start,
            end,
            granularity,
            cells: vec![init; size as usize],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn granularity(&self) -> i64 {
        self.granularity
    }

    #[inline]
    pub fn get(&self, idx: SlotIdx) -> u32 {
        self.cells[idx]
    }

    #[inline]
    pub fn set(&mut self, idx: SlotIdx, value: u32) {
        self.cells[idx] = value;
    }

    pub fn fill(&mut self, value: u32) {
        self.cells.fill(value);
    }

    /// Instant of the slot's lower boundary.
    pub fn idx_to_date(&self, idx: SlotIdx) -> DateTime<Utc> {
        self.start + Duration::seconds(idx as i64 * self.granularity)
    }

    /// Slot index containing `at`, unclamped: callers stepping a cursor need
    /// to observe positions outside the board.
    pub fn date_to_idx_unclamped(&self, at: DateTime<Utc>) -> i64 {
        (at - self.start).num_seconds().div_euclid(self.granularity)
    }

    /// Slot index containing `at`, clamped into the board.
    pub fn date_to_idx(&self, at: DateTime<Utc>) -> SlotIdx {
        self.date_to_idx_unclamped(at)
            .clamp(0, self.cells.len() as i64 - 1) as SlotIdx
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.cells.iter().copied()
    }

    /// Maximal runs of consecutive slots satisfying `pred`, clamped to
    /// `range` and at least `min_duration` seconds long. Used by the report
    /// layer to turn bookings into human-readable intervals.
    pub fn collect_intervals<F>(
        &self,
        range: TimeInterval,
        min_duration: i64,
        pred: F,
    ) -> Vec<TimeInterval>
    where
        F: Fn(u32) -> bool,
    {
        let lo = self.date_to_idx(range.start);
        let hi = self.date_to_idx(range.end);
        let min_slots = (min_duration / self.granularity).max(1) as usize;

        let mut out = Vec::new();
        let mut run_start: Option<SlotIdx> = None;
        for idx in lo..=hi {
            let matches = idx < hi && pred(self.cells[idx]);
            match (matches, run_start) {
                (true, None) => run_start = Some(idx),
                (false, Some(from)) => {
                    if idx - from >= min_slots {
                        out.push(TimeInterval::new(
                            self.idx_to_date(from).max(range.start),
                            self.idx_to_date(idx).min(range.end),
                        ));
                    }
                    run_start = None;
                }
                _ => {}
            }
        }
        out
    }
}
