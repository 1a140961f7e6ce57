//! `Decider(ctx, key) → (allow, err)` and its `MultiDimension`
//! composition (spec §4.3). This is the one interface every algorithm —
//! local or shared — is built behind, so callers never know which kind
//! of limiter they're holding.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

#[async_trait]
pub trait Decider: Send + Sync {
    /// A short name used only in logs and `DenyReason::dimension`.
    fn name(&self) -> &str;

    async fn allow(&self, key: &str) -> Result<bool>;
}

/// Reported on the first dimension (if any) that denied a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenyReason {
    pub dimension: String,
}

/// Evaluates dimensions in order; any deny short-circuits with that
/// dimension's name attached. Any decider error fails that dimension
/// open (counts as allow) and emits a `tracing::warn!` rather than
/// aborting the whole request — exactly spec §4.3's composition rule.
/// The whole evaluation is further bounded by `total_timeout` (default
/// 100ms); if it elapses the verdict is fail-open too.
pub struct MultiDimension {
    dimensions: Vec<Box<dyn Decider>>,
    total_timeout: Duration,
}

impl MultiDimension {
    pub fn new(dimensions: Vec<Box<dyn Decider>>) -> Self {
        MultiDimension { dimensions, total_timeout: Duration::from_millis(100) }
    }

    pub fn with_timeout(mut self, total_timeout: Duration) -> Self {
        self.total_timeout = total_timeout;
        self
    }

    /// Returns `Ok(None)` when every dimension allowed, `Ok(Some(reason))`
    /// naming the first denying dimension.
    pub async fn evaluate(&self, key: &str) -> Option<DenyReason> {
        let eval = async {
            for dim in &self.dimensions {
                match dim.allow(key).await {
                    Ok(true) => continue,
                    Ok(false) => return Some(DenyReason { dimension: dim.name().to_string() }),
                    Err(err) => {
                        warn!(dimension = %dim.name(), error = %err, "decider failed open");
                        continue;
                    }
                }
            }
            None
        };

        match tokio::time::timeout(self.total_timeout, eval).await {
            Ok(verdict) => verdict,
            Err(_) => {
                warn!(timeout_ms = %self.total_timeout.as_millis(), "rate limiter evaluation deadline exceeded, failing open");
                None
            }
        }
    }
}
