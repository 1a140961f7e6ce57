//! Local sliding window log (spec §4.3): ordered timestamps of accepted
//! requests. Compaction always discards expired entries, even when the
//! compacted log ends up empty — otherwise a key whose traffic drops to
//! zero would hold onto its longest-ago entries forever.

use crate::decider::Decider;
use crate::error::Result as LimiterResult;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use systems_common::Clock;

pub struct LocalSlidingWindowLog<C: Clock> {
    limit: usize,
    window: Duration,
    clock: Arc<C>,
    logs: DashMap<String, Mutex<VecDeque<Instant>>>,
}

impl<C: Clock> LocalSlidingWindowLog<C> {
    pub fn new(limit: usize, window: Duration, clock: Arc<C>) -> Self {
        LocalSlidingWindowLog { limit, window, clock, logs: DashMap::new() }
    }

    pub fn allow(&self, key: &str) -> bool {
        let now = self.clock.now();
        let entry = self.logs.entry(key.to_string()).or_insert_with(|| Mutex::new(VecDeque::new()));
        let mut log = entry.lock();
        let cutoff = now.checked_sub(self.window).unwrap_or(now);
        while let Some(&front) = log.front() {
            if front < cutoff {
                log.pop_front();
            } else {
                break;
            }
        }

        if log.len() < self.limit {
            log.push_back(now);
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl<C: Clock> Decider for LocalSlidingWindowLog<C> {
    fn name(&self) -> &str {
        "local_sliding_window_log"
    }

    async fn allow(&self, key: &str) -> LimiterResult<bool> {
        Ok(LocalSlidingWindowLog::allow(self, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use systems_common::ManualClock;

    #[test]
    fn denies_beyond_limit_then_allows_after_window_slides() {
        let clock = Arc::new(ManualClock::default());
        let log = LocalSlidingWindowLog::new(2, Duration::from_secs(1), clock.clone());
        assert!(log.allow("k"));
        assert!(log.allow("k"));
        assert!(!log.allow("k"));

        clock.advance(Duration::from_millis(1100));
        assert!(log.allow("k"));
    }

    #[test]
    fn compaction_empties_log_under_zero_traffic() {
        let clock = Arc::new(ManualClock::default());
        let log = LocalSlidingWindowLog::new(5, Duration::from_millis(100), clock.clone());
        assert!(log.allow("k"));
        clock.advance(Duration::from_secs(10));
        assert!(log.allow("k"));
        assert_eq!(log.logs.get("k").unwrap().lock().len(), 1);
    }
}
