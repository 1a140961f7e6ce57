//! Local sliding window counter (spec §4.3): fixed-size sub-window
//! buckets indexed by `now / subwindow`; valid buckets are summed to
//! decide. Cheaper than the log variant at the cost of some smoothing
//! error at window boundaries.

use crate::decider::Decider;
use crate::error::Result as LimiterResult;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use systems_common::Clock;

struct Buckets {
    counts: FxHashMap<u64, u32>,
    base: Instant,
}

pub struct LocalSlidingWindowCounter<C: Clock> {
    limit: u32,
    window: Duration,
    subwindow: Duration,
    subwindows_per_window: u64,
    clock: Arc<C>,
    state: DashMap<String, Mutex<Buckets>>,
}

impl<C: Clock> LocalSlidingWindowCounter<C> {
    pub fn new(limit: u32, window: Duration, n_subwindows: u64, clock: Arc<C>) -> Self {
        let subwindow = window / (n_subwindows.max(1) as u32);
        LocalSlidingWindowCounter {
            limit,
            window,
            subwindow,
            subwindows_per_window: n_subwindows.max(1),
            clock,
            state: DashMap::new(),
        }
    }

    fn bucket_index(&self, base: Instant, now: Instant) -> u64 {
        now.saturating_duration_since(base).as_nanos() as u64 / self.subwindow.as_nanos().max(1) as u64
    }

    pub fn allow(&self, key: &str) -> bool {
        let now = self.clock.now();
        let entry = self
            .state
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(Buckets { counts: FxHashMap::default(), base: now }));
        let mut buckets = entry.lock();
        let current = self.bucket_index(buckets.base, now);
        let lowest_valid = current.saturating_sub(self.subwindows_per_window - 1);
        buckets.counts.retain(|&idx, _| idx >= lowest_valid);

        let total: u32 = buckets.counts.values().sum();
        if total < self.limit {
            *buckets.counts.entry(current).or_insert(0) += 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl<C: Clock> Decider for LocalSlidingWindowCounter<C> {
    fn name(&self) -> &str {
        "local_sliding_window_counter"
    }

    async fn allow(&self, key: &str) -> LimiterResult<bool> {
        Ok(LocalSlidingWindowCounter::allow(self, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use systems_common::ManualClock;

    #[test]
    fn allows_up_to_limit_across_subwindows() {
        let clock = Arc::new(ManualClock::default());
        let counter = LocalSlidingWindowCounter::new(4, Duration::from_secs(1), 4, clock.clone());
        for _ in 0..4 {
            assert!(counter.allow("k"));
        }
        assert!(!counter.allow("k"));

        clock.advance(Duration::from_secs(2));
        assert!(counter.allow("k"));
    }
}
