//! Open/closed predicates for markets without a broker calendar.

use time::{Time, Weekday};

use crate::UtcDateTime;

/// Pure function of wall-clock time deciding whether a market is open.
pub trait OpenWindow: Send + Sync {
    fn is_open(&self, now: UtcDateTime) -> bool;
}

impl<F> OpenWindow for F
where
    F: Fn(UtcDateTime) -> bool + Send + Sync,
{
    fn is_open(&self, now: UtcDateTime) -> bool {
        self(now)
    }
}

/// Predicate that is never open.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverOpen;

impl OpenWindow for NeverOpen {
    fn is_open(&self, _now: UtcDateTime) -> bool {
        false
    }
}

/// Half-open `[start, end)` time-of-day range in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcRange {
    pub start: Time,
    pub end: Time,
}

impl UtcRange {
    pub const fn new(start: Time, end: Time) -> Self {
        Self { start, end }
    }

    fn contains(self, at: Time) -> bool {
        at >= self.start && at < self.end
    }
}

/// Weekday sessions expressed as UTC ranges; ignores exchange holidays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtcSessionWindow {
    ranges: Vec<UtcRange>,
    weekdays_only: bool,
}

impl UtcSessionWindow {
    pub fn new(ranges: Vec<UtcRange>) -> Self {
        Self {
            ranges,
            weekdays_only: true,
        }
    }

    pub fn including_weekends(mut self) -> Self {
        self.weekdays_only = false;
        self
    }

    /// Shanghai/Shenzhen continuous sessions, 09:30-11:30 and 13:00-15:00
    /// Beijing time.
    pub fn china_a_shares() -> Self {
        Self::new(vec![
            UtcRange::new(hms(1, 30), hms(3, 30)),
            UtcRange::new(hms(5, 0), hms(7, 0)),
        ])
    }
}

impl OpenWindow for UtcSessionWindow {
    fn is_open(&self, now: UtcDateTime) -> bool {
        if self.weekdays_only && matches!(now.weekday(), Weekday::Saturday | Weekday::Sunday) {
            return false;
        }
        let at = now.time();
        self.ranges.iter().any(|range| range.contains(at))
    }
}

fn hms(hour: u8, minute: u8) -> Time {
    Time::from_hms(hour, minute, 0).unwrap_or(Time::MIDNIGHT)
}
