//! `SharedStore`: the external "atomic scripting store" boundary
//! (conceptually Redis + Lua) that shared-algorithm variants run their
//! decisions against in a single round trip (spec §4.3).
//!
//! No client-side lock is taken over this boundary — the store itself
//! is responsible for the atomicity of whatever `eval_script` executes.
//! The in-memory fake below gives the same read-modify-write atomicity
//! via a `parking_lot::Mutex`-guarded map so the shared algorithms can
//! be tested without a real Redis instance.

use crate::error::{LimiterError, Result};
use async_trait::async_trait;

/// The result of a single atomic token-bucket or sliding-window
/// decision script: whether the request was allowed and the store
/// state left behind, for debugging/tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptResult {
    pub allow: bool,
}

#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Run the named script (`"token_bucket"` or `"sliding_window"`)
    /// against `key` with `args` encoding whatever the script needs
    /// (capacity, rate, window, now_millis, ...). Implementations must
    /// perform the whole read-modify-write atomically.
    async fn eval_script(&self, script: &str, key: &str, args: &[i64]) -> Result<ScriptResult>;
}

/// In-memory double used for tests and for the `cli` crate's default
/// configuration when no real shared store is configured.
pub mod testing {
    use super::*;
    use parking_lot::Mutex;
    use rustc_hash::FxHashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct TokenBucketRow {
        tokens_milli: i64,
        last_refill_millis: i64,
    }

    #[derive(Default)]
    struct SlidingWindowRow {
        timestamps_millis: Vec<i64>,
    }

    #[derive(Default)]
    pub struct FakeSharedStore {
        token_buckets: Mutex<FxHashMap<String, TokenBucketRow>>,
        sliding_windows: Mutex<FxHashMap<String, SlidingWindowRow>>,
        unreachable: AtomicBool,
    }

    impl FakeSharedStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_unreachable(&self, unreachable: bool) {
            self.unreachable.store(unreachable, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SharedStore for FakeSharedStore {
        async fn eval_script(&self, script: &str, key: &str, args: &[i64]) -> Result<ScriptResult> {
            if self.unreachable.load(Ordering::SeqCst) {
                return Err(LimiterError::StoreUnavailable("fake store is down".into()));
            }
            match script {
                "token_bucket" => {
                    let &[capacity_milli, rate_milli_per_sec, now_millis] = args else {
                        return Err(LimiterError::InvalidArgument("token_bucket expects 3 args".into()));
                    };
                    let mut rows = self.token_buckets.lock();
                    let row = rows.entry(key.to_string()).or_insert_with(|| TokenBucketRow {
                        tokens_milli: capacity_milli,
                        last_refill_millis: now_millis,
                    });
                    let elapsed_millis = (now_millis - row.last_refill_millis).max(0);
                    let refill = elapsed_millis * rate_milli_per_sec / 1000;
                    row.tokens_milli = (row.tokens_milli + refill).min(capacity_milli);
                    row.last_refill_millis = now_millis;

                    if row.tokens_milli >= 1000 {
                        row.tokens_milli -= 1000;
                        Ok(ScriptResult { allow: true })
                    } else {
                        Ok(ScriptResult { allow: false })
                    }
                }
                "sliding_window" => {
                    let &[limit, window_millis, now_millis] = args else {
                        return Err(LimiterError::InvalidArgument("sliding_window expects 3 args".into()));
                    };
                    let mut rows = self.sliding_windows.lock();
                    let row = rows.entry(key.to_string()).or_insert_with(SlidingWindowRow::default);
                    let cutoff = now_millis - window_millis;
                    row.timestamps_millis.retain(|&ts| ts >= cutoff);

                    if (row.timestamps_millis.len() as i64) < limit {
                        row.timestamps_millis.push(now_millis);
                        Ok(ScriptResult { allow: true })
                    } else {
                        Ok(ScriptResult { allow: false })
                    }
                }
                other => Err(LimiterError::InvalidArgument(format!("unknown script {other}"))),
            }
        }
    }
}
