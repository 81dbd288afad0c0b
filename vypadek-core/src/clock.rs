//! Time source and refresh interval bookkeeping.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
/// Clock backed by the system wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Useful for hosts that replay time and for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward (or backward for negative deltas).
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Last refresh timestamp plus the configured refresh interval.
///
/// A refresh is due when none happened yet or `now >= last_refresh + interval`.
pub struct RefreshClock {
    last_refresh: Option<DateTime<Utc>>,
    interval: TimeDelta,
}

impl RefreshClock {
    /// Create a clock that is immediately due.
    #[must_use]
    pub fn new(interval: TimeDelta) -> Self {
        Self {
            last_refresh: None,
            interval,
        }
    }

    /// Configured refresh interval.
    #[must_use]
    pub fn interval(&self) -> TimeDelta {
        self.interval
    }

    /// Start of the last refresh cycle, if any.
    #[must_use]
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    /// Earliest instant at which the next cycle may run.
    #[must_use]
    pub fn next_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
            .and_then(|last| last.checked_add_signed(self.interval))
    }

    /// Whether a new cycle should run at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match (self.last_refresh, self.next_refresh()) {
            (None, _) => true,
            (Some(_), Some(next)) => now >= next,
            // interval overflowed the calendar, nothing is ever due again
            (Some(_), None) => false,
        }
    }

    /// Record a cycle started at `now`.
    pub fn mark(&mut self, now: DateTime<Utc>) {
        self.last_refresh = Some(now);
    }
}
