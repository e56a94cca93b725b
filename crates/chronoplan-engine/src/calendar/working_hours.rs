use chrono::{DateTime, Datelike, LocalResult, Offset, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use chronoplan_common::SchedulingError;
use once_cell::sync::Lazy;
use smallvec::SmallVec;

/// Minutes since local midnight; half-open `[from, to)`.
type MinuteSpan = (u16, u16);

static STANDARD_PATTERN: Lazy<WeeklyPattern> = Lazy::new(|| {
    let mut p = WeeklyPattern::empty();
    p.set_hours(&weekdays(Weekday::Mon, Weekday::Fri), &[((9, 0), (17, 0))])
        .expect("static pattern is well-formed");
    p
});

/// Inclusive weekday range, wrapping across the week boundary
/// (`weekdays(Sat, Mon)` yields Sat, Sun, Mon).
pub fn weekdays(from: Weekday, to: Weekday) -> Vec<Weekday> {
    let mut out = Vec::with_capacity(7);
    let mut day = from;
    loop {
        out.push(day);
        if day == to {
            return out;
        }
        day = day.succ();
    }
}

/// A weekly working-hours pattern: per weekday, an ordered list of
/// non-overlapping half-open wall-clock intervals.
///
/// The pattern itself is timezone-free; [`WeeklyPattern::on_shift`] interprets
/// it in the timezone of whoever owns it (a resource, a shift, the project).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyPattern {
    /// Indexed by `Weekday::num_days_from_monday()`.
    days: [SmallVec<[MinuteSpan; 2]>; 7],
}

impl WeeklyPattern {
    /// Pattern with no working time at all.
    pub fn empty() -> Self {
        Self {
            days: Default::default(),
        }
    }

    /// The common Mon-Fri 09:00-17:00 pattern, used wherever nothing more
    /// specific was configured.
    pub fn standard() -> Self {
        STANDARD_PATTERN.clone()
    }

    /// Add working intervals (as `((hour, minute), (hour, minute))` pairs) to
    /// the given weekdays. Repeated calls extend the day, allowing fragmented
    /// shifts like `09-10, 11-12, 13-14`.
    pub fn set_hours(
        &mut self,
        days: &[Weekday],
        spans: &[((u32, u32), (u32, u32))],
    ) -> Result<(), SchedulingError> {
        let mut minutes: SmallVec<[MinuteSpan; 2]> = SmallVec::new();
        for &((fh, fm), (th, tm)) in spans {
            let from = fh * 60 + fm;
            let to = th * 60 + tm;
            if fh > 24 || th > 24 || fm > 59 || tm > 59 || from >= to || to > 24 * 60 {
                return Err(SchedulingError::InvalidWorkingInterval(format!(
                    "{fh:02}:{fm:02} - {th:02}:{tm:02}"
                )));
            }
            minutes.push((from as u16, to as u16));
        }
        for day in days {
            let slot = &mut self.days[day.num_days_from_monday() as usize];
            slot.extend(minutes.iter().copied());
            slot.sort_unstable();
        }
        Ok(())
    }

    /// True when the local `(weekday, minute-of-day)` falls inside a working
    /// interval.
    pub fn on_shift_local(&self, weekday: Weekday, minute_of_day: u16) -> bool {
        self.days[weekday.num_days_from_monday() as usize]
            .iter()
            .any(|&(from, to)| from <= minute_of_day && minute_of_day < to)
    }

    /// True when the UTC instant is working time under this pattern
    /// interpreted in `tz`.
    ///
    /// DST: a wall time removed by spring-forward never materializes from a
    /// UTC conversion, so those hours are off-shift by construction. A wall
    /// hour repeated by fall-back is on-shift only for its first (earlier UTC)
    /// occurrence.
    pub fn on_shift(&self, tz: Tz, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&tz);
        let naive = local.naive_local();
        if let LocalResult::Ambiguous(first, _) = tz.offset_from_local_datetime(&naive) {
            if local.offset().fix() != first.fix() {
                return false;
            }
        }
        let minute = (naive.hour() * 60 + naive.minute()) as u16;
        self.on_shift_local(naive.weekday(), minute)
    }

    /// Total working minutes in one week of this pattern.
    pub fn weekly_minutes(&self) -> u32 {
        self.days
            .iter()
            .flat_map(|spans| spans.iter())
            .map(|&(from, to)| (to - from) as u32)
            .sum()
    }

    /// True when no weekday carries any working interval.
    pub fn is_empty(&self) -> bool {
        self.days.iter().all(|spans| spans.is_empty())
    }
}
