//! `HealthGate`: periodic probe of the fast tier, flipping a boolean
//! `degraded` flag with hysteresis (spec §4.1).

use crate::traits::AtomicStore;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shared, cheaply-cloneable handle to the degraded flag. The facade and
/// the background probe task both hold one.
#[derive(Clone)]
pub struct HealthGate {
    degraded: Arc<AtomicBool>,
    consecutive_failures: Arc<AtomicU32>,
    consecutive_successes: Arc<AtomicU32>,
    hysteresis: u32,
    stop: Arc<Notify>,
}

impl HealthGate {
    pub fn new(hysteresis: u32) -> Self {
        HealthGate {
            degraded: Arc::new(AtomicBool::new(false)),
            consecutive_failures: Arc::new(AtomicU32::new(0)),
            consecutive_successes: Arc::new(AtomicU32::new(0)),
            hysteresis: hysteresis.max(1),
            stop: Arc::new(Notify::new()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Record the outcome of one probe, applying hysteresis. Returns
    /// `true` if this observation flipped the flag.
    fn observe(&self, healthy: bool) -> bool {
        if healthy {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
            if successes >= self.hysteresis && self.degraded.swap(false, Ordering::AcqRel) {
                info!("fast tier recovered, clearing degraded mode");
                return true;
            }
        } else {
            self.consecutive_successes.store(0, Ordering::Relaxed);
            let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
            if failures >= self.hysteresis && !self.degraded.swap(true, Ordering::AcqRel) {
                warn!("fast tier probe failed {failures} times, entering degraded mode");
                return true;
            }
        }
        false
    }

    /// Spawn the background probe loop. The returned task is cooperative:
    /// it exits once `stop()` is called. `on_recover` is invoked exactly
    /// once per transition back to healthy, to trigger the recovery
    /// worker.
    pub fn spawn<F>(
        &self,
        atomic: Arc<dyn AtomicStore>,
        interval: Duration,
        mut on_recover: F,
    ) -> JoinHandle<()>
    where
        F: FnMut() + Send + 'static,
    {
        let gate = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let healthy = atomic.health_check().await.is_ok();
                        let was_degraded = gate.is_degraded();
                        let flipped = gate.observe(healthy);
                        if flipped && was_degraded && !gate.is_degraded() {
                            on_recover();
                        }
                        debug!(healthy, degraded = gate.is_degraded(), "health probe");
                    }
                    _ = gate.stop.notified() => {
                        debug!("health gate stopping");
                        break;
                    }
                }
            }
        })
    }

    pub fn stop(&self) {
        self.stop.notify_waiters();
    }
}
