//! `WriteQueue`: append-only log of operations captured while degraded
//! (or dropped by a failed flush), drained on recovery (spec §3, §4.1).
//!
//! The queue itself has no state beyond the durable tier — it's a thin,
//! named wrapper over `DurableStore`'s queue operations so callers don't
//! reach into the store directly and so the "retain for a grace window
//! then purge" policy lives in one place.

use crate::error::Result;
use crate::model::WriteQueueEntry;
use crate::traits::DurableStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// How often the retention-purge task wakes up to check for expired
/// processed entries. Matches `ResetScheduler::spawn`'s hourly history
/// purge ticker.
const PURGE_TICK: std::time::Duration = std::time::Duration::from_secs(3600);

pub struct WriteQueue {
    durable: Arc<dyn DurableStore>,
    retention: chrono::Duration,
    stop: Notify,
}

impl WriteQueue {
    pub fn new(durable: Arc<dyn DurableStore>, retention: chrono::Duration) -> Self {
        WriteQueue { durable, retention, stop: Notify::new() }
    }

    pub async fn enqueue(&self, entry: WriteQueueEntry) -> Result<()> {
        self.durable.enqueue_write(entry).await?;
        Ok(())
    }

    /// Fetch up to `limit` unprocessed entries in FIFO order.
    pub async fn take_unprocessed(&self, limit: usize) -> Result<Vec<WriteQueueEntry>> {
        Ok(self.durable.dequeue_unprocessed(limit).await?)
    }

    /// Mark an entry processed. Safe to call more than once for the same
    /// id — replay of an already-processed entry is a no-op at the
    /// `DurableStore` layer.
    pub async fn mark_processed(&self, id: uuid::Uuid) -> Result<()> {
        self.durable.mark_processed(id).await?;
        Ok(())
    }

    /// Purge processed entries older than the configured retention
    /// window. Intended to run on its own periodic tick alongside the
    /// reset scheduler's archive-retention sweep.
    pub async fn purge_expired(&self) -> Result<u64> {
        let cutoff = Utc::now() - self.retention;
        let purged = self.durable.purge_processed_queue_before(cutoff).await?;
        if purged > 0 {
            debug!(purged, "purged processed write-queue entries");
        }
        Ok(purged)
    }

    /// Spawn the periodic retention-purge task, the same way
    /// `ResetScheduler::spawn` spawns its history-purge ticker. Honors
    /// `stop()`.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PURGE_TICK);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = queue.purge_expired().await {
                            error!(error = %e, "write-queue retention purge failed");
                        }
                    }
                    _ = queue.stop.notified() => break,
                }
            }
        })
    }

    pub fn stop(&self) {
        self.stop.notify_waiters();
    }
}
