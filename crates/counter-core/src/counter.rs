//! `Counter`: the public facade composing the health gate, batcher,
//! write queue, and reset scheduler (spec §4.1).

use crate::batcher::{BatcherHandle, WriteBatcher};
use crate::config::CounterConfig;
use crate::error::{CounterError, Result};
use crate::health::HealthGate;
use crate::model::{uniqueness_set_key, CounterOutcome, QueueOp, WriteQueueEntry};
use crate::queue::WriteQueue;
use crate::scheduler::ResetScheduler;
use crate::traits::{AtomicStore, DurableStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct Counter {
    atomic: Arc<dyn AtomicStore>,
    durable: Arc<dyn DurableStore>,
    config: CounterConfig,
    health: HealthGate,
    health_task: JoinHandle<()>,
    batcher_handle: BatcherHandle,
    batcher: AsyncMutex<Option<WriteBatcher>>,
    queue: Arc<WriteQueue>,
    queue_purge_task: JoinHandle<()>,
    scheduler: Arc<ResetScheduler>,
    scheduler_tasks: Vec<JoinHandle<()>>,
    recovery_guard: AsyncMutex<()>,
}

impl Counter {
    pub fn new(atomic: Arc<dyn AtomicStore>, durable: Arc<dyn DurableStore>, config: CounterConfig) -> Arc<Self> {
        let health = HealthGate::new(config.health_hysteresis);
        let queue = Arc::new(WriteQueue::new(durable.clone(), config.queue_retention));
        let queue_purge_task = queue.spawn();
        let batcher = WriteBatcher::spawn(
            durable.clone(),
            queue.clone(),
            config.batch_size,
            config.flush_interval,
            config.batcher_channel_capacity,
        );
        let batcher_handle = batcher.handle();
        let scheduler = Arc::new(ResetScheduler::new(
            atomic.clone(),
            durable.clone(),
            config.reset_timezone,
            config.archive_retention,
        ));
        let scheduler_tasks = scheduler.spawn();

        // The facade is returned as `Arc<Self>` (not built in two steps)
        // so the recovery callback passed into the health gate can hold
        // a weak reference back to it without a chicken-and-egg
        // construction order.
        Arc::new_cyclic(|weak: &std::sync::Weak<Counter>| {
            let weak_for_recovery = weak.clone();
            let atomic_for_gate = atomic.clone();
            let health_task = health.spawn(atomic_for_gate, config.probe_interval, move || {
                if let Some(this) = weak_for_recovery.upgrade() {
                    let this = this.clone();
                    tokio::spawn(async move {
                        this.recover().await;
                    });
                }
            });

            Counter {
                atomic,
                durable,
                config,
                health,
                health_task,
                batcher_handle,
                batcher: AsyncMutex::new(Some(batcher)),
                queue,
                queue_purge_task,
                scheduler,
                scheduler_tasks,
                recovery_guard: AsyncMutex::new(()),
            }
        })
    }

    pub fn is_degraded(&self) -> bool {
        self.health.is_degraded()
    }

    /// `Increment(name, delta, actorId?) → newValue | err` (spec §4.1).
    pub async fn increment(&self, name: &str, delta: i64, actor_id: Option<&str>) -> Result<CounterOutcome> {
        if delta < 0 {
            return Err(CounterError::InvalidArgument("delta must be >= 0".into()));
        }
        self.scheduler.track(name);

        if self.health.is_degraded() {
            return self.increment_degraded(name, delta, actor_id).await;
        }

        if let Some(actor) = actor_id {
            let today = chrono::Utc::now().date_naive();
            let set_key = uniqueness_set_key(name, today);
            match self.atomic.add_to_set(&set_key, actor).await {
                Ok(true) => {}
                Ok(false) => {
                    // Already contributed today: do not apply the delta,
                    // return the current value unchanged.
                    let current = self.atomic.read(name).await?.unwrap_or(0);
                    return Ok(CounterOutcome { value: current, degraded: false, deduped: true });
                }
                Err(e) => {
                    warn!(counter = name, error = %e, "uniqueness check failed, falling back to degraded path");
                    return self.increment_degraded(name, delta, actor_id).await;
                }
            }
        }

        match self.atomic.increment_by(name, delta).await {
            Ok(value) => {
                self.batcher_handle.submit(name.to_string(), delta).await;
                Ok(CounterOutcome { value, degraded: false, deduped: false })
            }
            Err(e) => {
                warn!(counter = name, error = %e, "fast tier increment failed, falling back to durable tier");
                self.increment_degraded(name, delta, actor_id).await
            }
        }
    }

    /// Degraded-mode path: write directly to the durable tier and record
    /// the op in the write queue. Per spec §4.1, uniqueness tracking is
    /// best-effort skipped while degraded — we document that here rather
    /// than attempt an approximation against a tier not built for set
    /// membership (see DESIGN.md's Open Question resolution).
    async fn increment_degraded(&self, name: &str, delta: i64, actor_id: Option<&str>) -> Result<CounterOutcome> {
        let value = self.durable.apply_delta(name, delta).await.map_err(|e| {
            CounterError::Internal(format!("both tiers failed for {name}: {e}"))
        })?;
        let entry = WriteQueueEntry::new(name, QueueOp::Increment, delta, actor_id.map(str::to_string));
        if let Err(e) = self.queue.enqueue(entry).await {
            warn!(counter = name, error = %e, "failed to enqueue degraded-mode write");
        }
        Ok(CounterOutcome { value, degraded: true, deduped: false })
    }

    /// `Decrement(name, delta) → newValue`, clamped at zero (spec §4.1).
    pub async fn decrement(&self, name: &str, delta: i64) -> Result<CounterOutcome> {
        if delta < 0 {
            return Err(CounterError::InvalidArgument("delta must be >= 0".into()));
        }
        self.scheduler.track(name);

        if self.health.is_degraded() {
            let current = self.durable.read(name).await.unwrap_or(0);
            let clamped_delta = delta.min(current.max(0));
            let value = self
                .durable
                .apply_delta(name, -clamped_delta)
                .await
                .map_err(|e| CounterError::Internal(format!("both tiers failed for {name}: {e}")))?
                .max(0);
            let entry = WriteQueueEntry::new(name, QueueOp::Decrement, clamped_delta, None);
            let _ = self.queue.enqueue(entry).await;
            return Ok(CounterOutcome { value, degraded: true, deduped: false });
        }

        let raw = self.atomic.increment_by(name, -delta).await?;
        let value = if raw < 0 {
            // Clamp at zero: correct the overshoot. Under heavy
            // concurrent decrements this correction can itself race, but
            // every racer clamps toward zero so the value converges to
            // zero rather than drifting negative.
            self.atomic.increment_by(name, -raw).await?.max(0)
        } else {
            raw
        };
        // The durable tier is kept in sync with the requested delta, not
        // the clamped correction: reconciliation of any transient
        // negative-durable/zero-fast skew happens on the next scheduled
        // reset, which overwrites both tiers from the fast tier's value.
        self.batcher_handle.submit(name.to_string(), -delta).await;
        Ok(CounterOutcome { value, degraded: false, deduped: false })
    }

    /// `GetValue(name) → int64`, zero for unknown counters (spec §4.1).
    /// A fast-tier read error falls back to the durable tier rather than
    /// surfacing to the caller, mirroring `increment`/`decrement` (spec
    /// §4.1/§7: "fast-tier errors trigger degradation, not caller error,
    /// unless both tiers fail").
    pub async fn get_value(&self, name: &str) -> Result<i64> {
        if self.health.is_degraded() {
            return Ok(self.durable.read(name).await?);
        }
        match self.atomic.read(name).await {
            Ok(value) => Ok(value.unwrap_or(0)),
            Err(e) => {
                warn!(counter = name, error = %e, "fast tier read failed, falling back to durable tier");
                Ok(self.durable.read(name).await?)
            }
        }
    }

    /// `GetMultiple(names) → map[name]int64` (spec §4.1).
    pub async fn get_multiple(&self, names: &[String]) -> Result<HashMap<String, i64>> {
        let mut out = HashMap::with_capacity(names.len());
        for name in names {
            out.insert(name.clone(), self.get_value(name).await?);
        }
        Ok(out)
    }

    /// `Reset(name) → ok`: zeros the fast tier and enqueues the same
    /// operation so the durable tier converges (spec §4.1).
    pub async fn reset(&self, name: &str) -> Result<()> {
        self.atomic.set(name, 0).await?;
        let entry = WriteQueueEntry::new(name, QueueOp::Reset, 0, None);
        self.queue.enqueue(entry).await?;
        Ok(())
    }

    /// Force an immediate archive+zero reset pass, bypassing the
    /// scheduler's wall-clock boundary. Exposed for the CLI's privileged
    /// reset endpoint and for tests.
    pub async fn run_scheduled_reset_now(&self) {
        self.scheduler.run_reset_once().await;
    }

    /// Recovery worker: reload durable values into the fast tier, then
    /// drain and replay the write queue (spec §4.1). Idempotent — safe to
    /// call more than once even if a previous run was interrupted, since
    /// replayed entries are marked processed before moving on and
    /// `DurableStore::mark_processed` is itself idempotent.
    async fn recover(&self) {
        let _guard = self.recovery_guard.lock().await;
        if self.health.is_degraded() {
            // Flipped back to degraded before we got the lock; bail and
            // let the next recovery trigger retry.
            return;
        }
        info!("fast tier recovered, starting recovery worker");

        // Step (a): reload durable values into the fast tier in batches,
        // for every tracked counter whose write queue has no pending
        // entries (spec §4.1). Counters with a backlog are deliberately
        // skipped here: their durable value already includes every
        // delta the queue is about to replay onto the fast tier, and
        // reloading them too would double-apply those deltas. Their fast
        // tier instead starts from its own last-known value (untouched
        // while the fast tier was down) and catches up purely via replay
        // in step (b).
        let pending: std::collections::HashSet<String> = match self.queue.take_unprocessed(usize::MAX).await {
            Ok(entries) => entries.iter().map(|e| e.counter.clone()).collect(),
            Err(e) => {
                warn!(error = %e, "recovery: failed to read write queue ahead of reload, skipping reload step");
                Default::default()
            }
        };
        let names: Vec<String> = self
            .scheduler
            .tracked_names()
            .into_iter()
            .filter(|n| !pending.contains(n))
            .collect();
        for chunk in names.chunks(self.config.recovery_batch_size.max(1)) {
            for name in chunk {
                match self.durable.read(name).await {
                    Ok(value) => {
                        if let Err(e) = self.atomic.set(name, value).await {
                            warn!(counter = %name, error = %e, "recovery: failed to reload value into fast tier");
                        }
                    }
                    Err(e) => {
                        warn!(counter = %name, error = %e, "recovery: failed to read durable value for reload");
                    }
                }
            }
        }

        // Step (b): drain the write queue, replaying onto the fast tier
        // (now reloaded for every counter without a backlog).
        loop {
            let batch = match self.queue.take_unprocessed(self.config.recovery_batch_size).await {
                Ok(b) => b,
                Err(e) => {
                    warn!(error = %e, "recovery: failed to read write queue, aborting this pass");
                    return;
                }
            };
            if batch.is_empty() {
                break;
            }
            for entry in &batch {
                if entry.is_processed() {
                    continue;
                }
                let applied = match entry.op {
                    QueueOp::Increment => self.atomic.increment_by(&entry.counter, entry.delta).await,
                    QueueOp::Decrement => self.atomic.increment_by(&entry.counter, -entry.delta).await,
                    QueueOp::Reset => self.atomic.set(&entry.counter, 0).await.map(|_| 0),
                };
                match applied {
                    Ok(_) => {
                        if let Err(e) = self.queue.mark_processed(entry.id).await {
                            warn!(error = %e, entry = %entry.id, "recovery: failed to mark entry processed");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, entry = %entry.id, "recovery: replay failed, will retry next pass");
                    }
                }
            }
            if batch.len() < self.config.recovery_batch_size {
                break;
            }
        }
        info!("recovery worker finished draining write queue");
    }

    /// Flush the batcher and stop all background work.
    pub async fn shutdown(&self) {
        if let Some(batcher) = self.batcher.lock().await.take() {
            batcher.shutdown().await;
        }
        self.health.stop();
        self.scheduler.stop();
        self.queue.stop();
        self.health_task.abort();
        self.queue_purge_task.abort();
        for task in &self.scheduler_tasks {
            task.abort();
        }
    }
}
