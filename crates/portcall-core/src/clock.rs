//! Time sources for the engine.
//!
//! The engine has no clock of its own. Timestamps it stamps itself
//! (operation start/end, `last_updated`, event times) come from a [`Clock`]
//! supplied by the host: wall time in production, a host-advanced
//! [`ManualClock`] in simulations and tests.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when the host moves it.
///
/// Stores milliseconds since the Unix epoch in an atomic so it can be shared
/// between the engine and the host loop without a lock.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Create a clock reading `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Jump to `at`.
    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::Release);
    }

    /// Move forward by `by` (saturating at the representable range).
    pub fn advance(&self, by: Duration) {
        let step = by.num_milliseconds();
        let _ = self
            .millis
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(step))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::Acquire)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn manual_clock_reads_start() {
        let clock = ManualClock::new(start());
        assert_eq!(clock.now(), start());
    }

    #[test]
    fn manual_clock_advances_and_jumps() {
        let clock = ManualClock::new(start());
        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(), start() + Duration::minutes(90));

        clock.set(start());
        assert_eq!(clock.now(), start());
    }

    #[test]
    fn system_clock_is_recent() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before);
    }
}
