//! Wall-clock source pinned to Eastern Canada civil time.
//!
//! Every timestamp the tracker writes is `America/Toronto` local time with
//! its UTC offset embedded, independent of the host's zone.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use chrono_tz::America::Toronto;
use std::sync::Mutex;

/// Timestamp with the Toronto offset in effect at that instant.
pub type Timestamp = DateTime<FixedOffset>;

/// Source of "now" for every write path.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// System clock converted to `America/Toronto`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TorontoClock;

impl Clock for TorontoClock {
    fn now(&self) -> Timestamp {
        to_toronto(Utc::now())
    }
}

/// Convert any UTC instant to Toronto local time (DST aware).
pub fn to_toronto(instant: DateTime<Utc>) -> Timestamp {
    instant.with_timezone(&Toronto).fixed_offset()
}

/// Manually advanced clock for deterministic ordering.
///
/// Each call to `now` returns the current value and then moves it forward by
/// the configured step.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(DateTime<Utc>, chrono::Duration)>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>, step: chrono::Duration) -> Self {
        Self {
            state: Mutex::new((start, step)),
        }
    }

    /// Jump the clock to a specific instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.0 = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let current = guard.0;
        guard.0 = current + guard.1;
        to_toronto(current)
    }
}

/// Text form stored in the database (RFC 3339, microseconds, offset kept).
pub(crate) fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}

pub(crate) fn parse_timestamp(s: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(s).ok()
}

/// UTC microseconds used purely as a sort key.
pub(crate) fn sort_key(ts: &Timestamp) -> i64 {
    ts.timestamp_micros()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_winter_offset_is_est() {
        let instant = Utc.with_ymd_and_hms(2025, 1, 15, 17, 0, 0).unwrap();
        let local = to_toronto(instant);
        assert_eq!(local.offset().local_minus_utc(), -5 * 3600);
        assert_eq!(format_timestamp(&local), "2025-01-15T12:00:00.000000-05:00");
    }

    #[test]
    fn test_summer_offset_is_edt() {
        let instant = Utc.with_ymd_and_hms(2025, 7, 1, 16, 0, 0).unwrap();
        let local = to_toronto(instant);
        assert_eq!(local.offset().local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn test_sort_key_orders_across_dst_fallback() {
        // 01:30 EDT happens before 01:10 EST on the fall-back night.
        let earlier = to_toronto(Utc.with_ymd_and_hms(2025, 11, 2, 5, 30, 0).unwrap());
        let later = to_toronto(Utc.with_ymd_and_hms(2025, 11, 2, 6, 10, 0).unwrap());
        assert!(format_timestamp(&earlier) > format_timestamp(&later));
        assert!(sort_key(&earlier) < sort_key(&later));
    }

    #[test]
    fn test_manual_clock_set_crosses_fallback() {
        let clock = ManualClock::new(
            Utc.with_ymd_and_hms(2025, 11, 2, 5, 30, 0).unwrap(),
            chrono::Duration::minutes(1),
        );
        let before = clock.now();
        assert_eq!(before.offset().local_minus_utc(), -4 * 3600);

        clock.set(Utc.with_ymd_and_hms(2025, 11, 2, 6, 10, 0).unwrap());
        let after = clock.now();
        assert_eq!(after.offset().local_minus_utc(), -5 * 3600);
        assert!(sort_key(&before) < sort_key(&after));

        let next = clock.now();
        assert_eq!((next - after).num_minutes(), 1);
    }

    #[test]
    fn test_manual_clock_steps() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start, chrono::Duration::seconds(1));
        let a = clock.now();
        let b = clock.now();
        assert_eq!((b - a).num_seconds(), 1);
        assert_eq!(parse_timestamp(&format_timestamp(&a)), Some(a));
    }
}
