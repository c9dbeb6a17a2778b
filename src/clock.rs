//! Time source for the scheduler.
//!
//! Every scheduling operation takes `now` explicitly; a `Clock` is how the
//! surrounding application produces it. `ManualClock` replaces the old
//! "advance one day" simulated date and keeps tests deterministic.

use chrono::{DateTime, Duration, Utc};
use std::cell::Cell;

pub trait Clock {
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

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Cell::new(start),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        self.current.set(time);
    }

    pub fn advance(&self, by: Duration) {
        self.current.set(self.current.get() + by);
    }

    /// Advances by 24 hours.
    pub fn advance_day(&self) {
        self.advance(Duration::days(1));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.current.get()
    }
}
