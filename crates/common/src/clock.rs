//! Clock abstraction.
//!
//! Every component that reasons about elapsed time (the rate limiter's
//! bucket refill, the room reaper's idle/TTL windows, the counter
//! health gate's probe cadence) takes a `Clock` rather than calling
//! `Instant::now()`/`SystemTime::now()` directly, so tests can swap in a
//! `ManualClock` and assert exact boundary behaviour instead of sleeping.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// Wall-clock and monotonic time source.
pub trait Clock: Send + Sync {
    /// Monotonic instant, for measuring elapsed durations.
    fn now(&self) -> Instant;
    /// Wall-clock time, for timestamps that outlive the process (history
    /// rows, event timestamps, gossip heartbeats).
    fn utc_now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock whose `now()` only advances when told to, for deterministic
/// tests of rate limiters, reapers, and schedulers.
pub struct ManualClock {
    base: Instant,
    offset_millis: AtomicI64,
    utc_base: DateTime<Utc>,
}

impl ManualClock {
    pub fn new(utc_base: DateTime<Utc>) -> Self {
        ManualClock {
            base: Instant::now(),
            offset_millis: AtomicI64::new(0),
            utc_base,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_millis
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_millis.load(Ordering::SeqCst) as u64)
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.utc_base + chrono::Duration::milliseconds(self.offset_millis.load(Ordering::SeqCst))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock::new(Utc::now())
    }
}

/// Milliseconds since the Unix epoch, for stores (shared rate limiter
/// scripts, gossip heartbeats) that need a millisecond-precision,
/// wall-clock timestamp rather than a process-local `Instant`.
pub fn millis_since_epoch(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}
