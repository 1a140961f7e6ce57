//! Deadline/cancellation primitive shared by every external call site.
//!
//! Spec §5: "every external call (durable store, atomic store, peer RPC)
//! accepts a context with deadline." Rust has no ambient context object
//! the way Go does; the idiomatic equivalent is an explicit value passed
//! at the call site and `tokio::time::timeout` used by the caller that
//! owns the deadline.

use std::time::{Duration, Instant};

/// An absolute point in time by which an operation must complete.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(d: Duration) -> Self {
        Deadline(Instant::now() + d)
    }

    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.0
    }
}
