//! Local token bucket (spec §4.3): capacity `C`, refill rate `r`
//! tokens/sec, per-key state guarded by a striped fine-grained lock.

use crate::decider::Decider;
use crate::error::Result as LimiterResult;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use systems_common::Clock;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

pub struct LocalTokenBucket<C: Clock> {
    capacity: f64,
    rate_per_sec: f64,
    clock: Arc<C>,
    buckets: DashMap<String, Mutex<BucketState>>,
}

impl<C: Clock> LocalTokenBucket<C> {
    pub fn new(capacity: u32, rate_per_sec: f64, clock: Arc<C>) -> Self {
        LocalTokenBucket {
            capacity: capacity as f64,
            rate_per_sec,
            clock,
            buckets: DashMap::new(),
        }
    }

    /// Returns `true` (allow) if a token was available and consumed.
    /// `lastRefill` is updated unconditionally on every call, including
    /// denials, to avoid accumulated drift (spec §4.3).
    pub fn allow(&self, key: &str) -> bool {
        let now = self.clock.now();
        let entry = self.buckets.entry(key.to_string()).or_insert_with(|| {
            Mutex::new(BucketState { tokens: self.capacity, last_refill: now })
        });
        let mut state = entry.lock();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate_per_sec).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl<C: Clock> Decider for LocalTokenBucket<C> {
    fn name(&self) -> &str {
        "local_token_bucket"
    }

    async fn allow(&self, key: &str) -> LimiterResult<bool> {
        Ok(LocalTokenBucket::allow(self, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use systems_common::ManualClock;

    #[test]
    fn allows_up_to_capacity_then_denies_then_refills() {
        let clock = Arc::new(ManualClock::default());
        let bucket = LocalTokenBucket::new(5, 1.0, clock.clone());
        for _ in 0..5 {
            assert!(bucket.allow("player-1"));
        }
        assert!(!bucket.allow("player-1"));

        clock.advance(std::time::Duration::from_secs(1));
        assert!(bucket.allow("player-1"));
    }

    #[test]
    fn keys_are_independent() {
        let clock = Arc::new(ManualClock::default());
        let bucket = LocalTokenBucket::new(1, 1.0, clock);
        assert!(bucket.allow("a"));
        assert!(bucket.allow("b"));
        assert!(!bucket.allow("a"));
    }
}
