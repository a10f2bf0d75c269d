//! Wall-clock and monotonic timing collaborator (spec.md §6f).

use chrono::{DateTime, Utc};
use std::time::Instant;

/// Narrow interface for time, so tests can substitute a fixed clock.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
    fn now_iso(&self) -> String {
        self.now_utc().to_rfc3339()
    }
    fn monotonic_now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic_now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
pub struct FixedClock {
    pub fixed: DateTime<Utc>,
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.fixed
    }

    fn monotonic_now(&self) -> Instant {
        Instant::now()
    }
}
