//! Time sources for write stamps and staleness checks.

use std::sync::RwLock;

use time::{Duration, OffsetDateTime};

/// Source of the current time.
///
/// Injected into the writer and lookup so the staleness gate can be
/// exercised in tests without waiting out the threshold.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> OffsetDateTime;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Settable time source for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, now: OffsetDateTime) {
        *write_lock(&self.now) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = write_lock(&self.now);
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> OffsetDateTime {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

fn write_lock(lock: &RwLock<OffsetDateTime>) -> std::sync::RwLockWriteGuard<'_, OffsetDateTime> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(datetime!(2025-06-01 12:00 UTC));
        clock.advance(Duration::hours(3));
        assert_eq!(clock.now_utc(), datetime!(2025-06-01 15:00 UTC));
    }

    #[test]
    fn manual_clock_can_be_set_backwards() {
        let clock = ManualClock::new(datetime!(2025-06-01 12:00 UTC));
        clock.set(datetime!(2025-05-31 12:00 UTC));
        assert_eq!(clock.now_utc(), datetime!(2025-05-31 12:00 UTC));
    }
}
