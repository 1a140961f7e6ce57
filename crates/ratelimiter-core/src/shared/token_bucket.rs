//! Shared token bucket (spec §4.3): `lastRefill` stored in millisecond
//! precision to avoid rounding error at high rates, decided in a single
//! atomic round trip against a [`SharedStore`].

use crate::decider::Decider;
use crate::error::Result;
use crate::shared::store::SharedStore;
use async_trait::async_trait;
use std::sync::Arc;
use systems_common::Clock;

pub struct SharedTokenBucket<C: Clock> {
    name: String,
    capacity_milli: i64,
    rate_milli_per_sec: i64,
    store: Arc<dyn SharedStore>,
    clock: Arc<C>,
}

impl<C: Clock> SharedTokenBucket<C> {
    pub fn new(name: impl Into<String>, capacity: u32, rate_per_sec: f64, store: Arc<dyn SharedStore>, clock: Arc<C>) -> Self {
        SharedTokenBucket {
            name: name.into(),
            capacity_milli: capacity as i64 * 1000,
            rate_milli_per_sec: (rate_per_sec * 1000.0).round() as i64,
            store,
            clock,
        }
    }
}

#[async_trait]
impl<C: Clock> Decider for SharedTokenBucket<C> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn allow(&self, key: &str) -> Result<bool> {
        let now_millis = systems_common::millis_since_epoch(self.clock.utc_now());
        let result = self
            .store
            .eval_script("token_bucket", key, &[self.capacity_milli, self.rate_milli_per_sec, now_millis])
            .await?;
        Ok(result.allow)
    }
}
