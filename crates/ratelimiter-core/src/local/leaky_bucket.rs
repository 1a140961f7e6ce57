//! Local leaky bucket (spec §4.3): capacity `C`, leak rate `r`.

use crate::decider::Decider;
use crate::error::Result as LimiterResult;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use systems_common::Clock;

struct BucketState {
    level: f64,
    last_leak: Instant,
}

pub struct LocalLeakyBucket<C: Clock> {
    capacity: f64,
    leak_per_sec: f64,
    clock: Arc<C>,
    buckets: DashMap<String, Mutex<BucketState>>,
}

impl<C: Clock> LocalLeakyBucket<C> {
    pub fn new(capacity: u32, leak_per_sec: f64, clock: Arc<C>) -> Self {
        LocalLeakyBucket {
            capacity: capacity as f64,
            leak_per_sec,
            clock,
            buckets: DashMap::new(),
        }
    }

    /// `lastLeak` is updated unconditionally on every call, same drift
    /// guard as the token bucket.
    pub fn allow(&self, key: &str) -> bool {
        let now = self.clock.now();
        let entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(BucketState { level: 0.0, last_leak: now }));
        let mut state = entry.lock();
        let elapsed = now.saturating_duration_since(state.last_leak).as_secs_f64();
        state.level = (state.level - elapsed * self.leak_per_sec).max(0.0);
        state.last_leak = now;

        if state.level < self.capacity {
            state.level += 1.0;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl<C: Clock> Decider for LocalLeakyBucket<C> {
    fn name(&self) -> &str {
        "local_leaky_bucket"
    }

    async fn allow(&self, key: &str) -> LimiterResult<bool> {
        Ok(LocalLeakyBucket::allow(self, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use systems_common::ManualClock;

    #[test]
    fn fills_then_denies_then_drains() {
        let clock = Arc::new(ManualClock::default());
        let bucket = LocalLeakyBucket::new(3, 1.0, clock.clone());
        assert!(bucket.allow("k"));
        assert!(bucket.allow("k"));
        assert!(bucket.allow("k"));
        assert!(!bucket.allow("k"));

        clock.advance(std::time::Duration::from_secs(1));
        assert!(bucket.allow("k"));
    }
}
