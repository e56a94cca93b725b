//! Booking caps per time period, optionally scoped to one resource.
//!
//! A limit counts booked slots per period window. Upper limits gate bookings
//! while the scheduler runs; lower limits are verified once a scenario is
//! finished and reported, never enforced.

use crate::model::ResourceId;
use chrono::{DateTime, Datelike, Duration, Utc};
use chronoplan_common::TimeInterval;

pub const DAY_SECONDS: i64 = 86_400;
pub const WEEK_SECONDS: i64 = 7 * DAY_SECONDS;
pub const ROLLING_MONTH_SECONDS: i64 = 30 * DAY_SECONDS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitPeriod {
    Daily,
    Weekly,
    Monthly,
    /// One window spanning the whole limit interval.
    Whole,
}

/// How `Monthly` windows are laid out. Thirty-day rolling windows match the
/// historical behavior; calendar months follow month boundaries in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthPolicy {
    #[default]
    RollingThirtyDays,
    CalendarMonths,
}

/// Declarative form of a limit, attached to resources and tasks while a
/// project is being built. Materialized into counting [`Limit`]s per
/// scenario once the project interval and granularity are fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitSpec {
    pub period: LimitPeriod,
    /// Cap expressed in seconds of booked time.
    pub value: i64,
    pub upper: bool,
    /// Restrict the limit to part of the project; defaults to the whole
    /// project interval.
    pub interval: Option<TimeInterval>,
    /// When set, only bookings of this resource count.
    pub resource: Option<ResourceId>,
}

impl LimitSpec {
    pub fn upper(period: LimitPeriod, value_seconds: i64) -> Self {
        Self {
            period,
            value: value_seconds,
            upper: true,
            interval: None,
            resource: None,
        }
    }

    pub fn lower(period: LimitPeriod, value_seconds: i64) -> Self {
        Self {
            upper: false,
            ..Self::upper(period, value_seconds)
        }
    }

    pub fn daily_max(value_seconds: i64) -> Self {
        Self::upper(LimitPeriod::Daily, value_seconds)
    }

    pub fn weekly_max(value_seconds: i64) -> Self {
        Self::upper(LimitPeriod::Weekly, value_seconds)
    }

    pub fn monthly_max(value_seconds: i64) -> Self {
        Self::upper(LimitPeriod::Monthly, value_seconds)
    }

    pub fn maximum(value_seconds: i64) -> Self {
        Self::upper(LimitPeriod::Whole, value_seconds)
    }

    pub fn within(mut self, interval: TimeInterval) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn for_resource(mut self, resource: ResourceId) -> Self {
        self.resource = Some(resource);
        self
    }
}

/// One materialized limit with its per-period counters.
#[derive(Debug, Clone)]
pub struct Limit {
    pub period: LimitPeriod,
    /// Cap in slots.
    pub value: i32,
    pub upper: bool,
    pub resource: Option<ResourceId>,
    interval: TimeInterval,
    /// Offset of the limit interval from the project start, in seconds.
    interval_offset: i64,
    granularity: i64,
    month_policy: MonthPolicy,
    project_start: DateTime<Utc>,
    counts: Vec<i32>,
}

impl Limit {
    fn period_seconds(&self) -> i64 {
        match self.period {
            LimitPeriod::Daily => DAY_SECONDS,
            LimitPeriod::Weekly => WEEK_SECONDS,
            LimitPeriod::Monthly => ROLLING_MONTH_SECONDS,
            LimitPeriod::Whole => self.interval.seconds().max(1),
        }
    }

    fn from_spec(
        spec: &LimitSpec,
        project_interval: TimeInterval,
        granularity: i64,
        month_policy: MonthPolicy,
    ) -> Self {
        let interval = spec.interval.unwrap_or(project_interval);
        let mut limit = Limit {
            period: spec.period,
            value: (spec.value / granularity).max(1) as i32,
            upper: spec.upper,
            resource: spec.resource,
            interval,
            interval_offset: (interval.start - project_interval.start).num_seconds(),
            granularity,
            month_policy,
            project_start: project_interval.start,
            counts: Vec::new(),
        };
        let windows = match (limit.period, month_policy) {
            (LimitPeriod::Monthly, MonthPolicy::CalendarMonths) => {
                month_index(interval.end) - month_index(interval.start) + 1
            }
            _ => {
                // Ceiling, not +1: a trailing window no slot can ever map to
                // would read as permanently underfilled for lower limits.
                let period = limit.period_seconds();
                (interval.seconds() + period - 1) / period
            }
        };
        limit.counts = vec![0; windows.max(1) as usize];
        limit
    }

    /// Counter index for a project slot, `None` when the slot lies outside
    /// the limit interval.
    fn window_index(&self, slot: usize) -> Option<usize> {
        let slot_offset = slot as i64 * self.granularity - self.interval_offset;
        if slot_offset < 0 || slot_offset >= self.interval.seconds() {
            return None;
        }
        let idx = match (self.period, self.month_policy) {
            (LimitPeriod::Monthly, MonthPolicy::CalendarMonths) => {
                let at = self.project_start + Duration::seconds(slot as i64 * self.granularity);
                month_index(at) - month_index(self.interval.start)
            }
            _ => slot_offset / self.period_seconds(),
        };
        if (idx as usize) < self.counts.len() {
            Some(idx as usize)
        } else {
            None
        }
    }

    fn matches(&self, resource: Option<ResourceId>) -> bool {
        match self.resource {
            None => true,
            Some(scoped) => resource == Some(scoped),
        }
    }

    pub fn inc(&mut self, slot: usize, resource: Option<ResourceId>) {
        if !self.matches(resource) {
            return;
        }
        if let Some(w) = self.window_index(slot) {
            self.counts[w] += 1;
        }
    }

    pub fn dec(&mut self, slot: usize, resource: Option<ResourceId>) {
        if !self.matches(resource) {
            return;
        }
        if let Some(w) = self.window_index(slot) {
            self.counts[w] -= 1;
        }
    }

    /// Would one more booked slot stay within this limit?
    pub fn ok(&self, slot: usize, checking_upper: bool, resource: Option<ResourceId>) -> bool {
        if self.upper != checking_upper || !self.matches(resource) {
            return true;
        }
        match self.window_index(slot) {
            Some(w) => {
                if self.upper {
                    self.counts[w] < self.value
                } else {
                    self.counts[w] >= self.value
                }
            }
            None => true,
        }
    }

    /// Window indices whose counters violate a lower limit. Empty for upper
    /// limits.
    pub fn underfilled_windows(&self) -> Vec<usize> {
        if self.upper {
            return Vec::new();
        }
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c < self.value)
            .map(|(w, _)| w)
            .collect()
    }
}

fn month_index(at: DateTime<Utc>) -> i64 {
    at.year() as i64 * 12 + at.month0() as i64
}

/// All limits attached to one task or resource, checked and bumped together.
#[derive(Debug, Clone, Default)]
pub struct Limits {
    limits: Vec<Limit>,
}

impl Limits {
    pub fn materialize(
        specs: &[LimitSpec],
        project_interval: TimeInterval,
        granularity: i64,
        month_policy: MonthPolicy,
    ) -> Self {
        Self {
            limits: specs
                .iter()
                .map(|s| Limit::from_spec(s, project_interval, granularity, month_policy))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    pub fn inc(&mut self, slot: usize, resource: Option<ResourceId>) {
        for limit in &mut self.limits {
            limit.inc(slot, resource);
        }
    }

    pub fn dec(&mut self, slot: usize, resource: Option<ResourceId>) {
        for limit in &mut self.limits {
            limit.dec(slot, resource);
        }
    }

    pub fn ok(&self, slot: usize, checking_upper: bool, resource: Option<ResourceId>) -> bool {
        self.limits
            .iter()
            .all(|l| l.ok(slot, checking_upper, resource))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Limit> {
        self.limits.iter()
    }
}
