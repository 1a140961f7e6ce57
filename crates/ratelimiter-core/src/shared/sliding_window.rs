//! Shared sliding window (spec §4.3): the decision script removes
//! entries older than `now - window`, counts the remainder, and
//! conditionally adds the new entry — all in one atomic round trip.

use crate::decider::Decider;
use crate::error::Result;
use crate::shared::store::SharedStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use systems_common::Clock;

pub struct SharedSlidingWindow<C: Clock> {
    name: String,
    limit: i64,
    window_millis: i64,
    store: Arc<dyn SharedStore>,
    clock: Arc<C>,
}

impl<C: Clock> SharedSlidingWindow<C> {
    pub fn new(name: impl Into<String>, limit: u32, window: Duration, store: Arc<dyn SharedStore>, clock: Arc<C>) -> Self {
        SharedSlidingWindow {
            name: name.into(),
            limit: limit as i64,
            window_millis: window.as_millis() as i64,
            store,
            clock,
        }
    }
}

#[async_trait]
impl<C: Clock> Decider for SharedSlidingWindow<C> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn allow(&self, key: &str) -> Result<bool> {
        let now_millis = systems_common::millis_since_epoch(self.clock.utc_now());
        let result = self
            .store
            .eval_script("sliding_window", key, &[self.limit, self.window_millis, now_millis])
            .await?;
        Ok(result.allow)
    }
}
