//! `ResetScheduler`: archives and zeros daily counters at a configured
//! local wall-clock boundary, and purges archive history older than a
//! retention window (spec §4.1).

use crate::model::{uniqueness_set_key, CounterHistoryEntry};
use crate::traits::{AtomicStore, DurableStore};
use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Utc};
use chrono_tz::Tz;
use dashmap::DashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Tracks which counter names participate in the daily reset, and runs
/// the two background tasks (reset-at-boundary, retention purge).
pub struct ResetScheduler {
    atomic: Arc<dyn AtomicStore>,
    durable: Arc<dyn DurableStore>,
    tracked: Arc<DashSet<String>>,
    tz: Tz,
    retention: ChronoDuration,
    /// Guards against overlapping reset runs (spec: "at-most-one
    /// concurrent reset run").
    reset_running: Arc<AtomicBool>,
    stop: Arc<Notify>,
}

impl ResetScheduler {
    pub fn new(
        atomic: Arc<dyn AtomicStore>,
        durable: Arc<dyn DurableStore>,
        tz: Tz,
        retention: ChronoDuration,
    ) -> Self {
        ResetScheduler {
            atomic,
            durable,
            tracked: Arc::new(DashSet::new()),
            tz,
            retention,
            reset_running: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(Notify::new()),
        }
    }

    /// Register a counter name so it participates in the daily reset.
    /// Called by the facade on first touch of a counter.
    pub fn track(&self, name: &str) {
        if self.tracked.insert(name.to_string()) {
            info!(counter = name, "registered counter for daily reset");
        }
    }

    /// Snapshot of counter names currently registered for the daily
    /// reset. Used by the facade's recovery worker to know which
    /// counters to reload from the durable tier after an outage (spec
    /// §4.1 recovery step (a)) — the scheduler is the one component that
    /// already has to track every counter name, so it's the natural
    /// owner of this list rather than duplicating it in `Counter`.
    pub fn tracked_names(&self) -> Vec<String> {
        self.tracked.iter().map(|e| e.key().clone()).collect()
    }

    fn next_boundary(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let local = from.with_timezone(&self.tz);
        let today_midnight = self
            .tz
            .with_ymd_and_hms(local.year(), local.month(), local.day(), 0, 0, 0)
            .single()
            .expect("local midnight is unambiguous for a calendar day");
        let next = if today_midnight > local {
            today_midnight
        } else {
            today_midnight + ChronoDuration::days(1)
        };
        next.with_timezone(&Utc)
    }

    /// Run one reset pass: archive + zero + delete-uniqueness-set for
    /// every tracked counter. Exposed directly so tests and the CLI's
    /// "force reset now" path don't have to wait for the scheduler tick.
    pub async fn run_reset_once(&self) {
        if self.reset_running.swap(true, Ordering::AcqRel) {
            warn!("reset already running, skipping overlapping trigger");
            return;
        }
        let yesterday = (Utc::now().with_timezone(&self.tz) - ChronoDuration::days(1))
            .date_naive();
        for counter in self.tracked.iter() {
            let name = counter.key().clone();
            if let Err(e) = self.reset_one(&name, yesterday).await {
                error!(counter = %name, error = %e, "counter archival failed, will retry next cycle");
            }
        }
        self.reset_running.store(false, Ordering::Release);
    }

    async fn reset_one(
        &self,
        name: &str,
        date: chrono::NaiveDate,
    ) -> Result<(), crate::error::CounterError> {
        let final_value = self.atomic.read(name).await?.unwrap_or(0);
        let set_key = uniqueness_set_key(name, date);
        let unique_members = self.atomic.set_members(&set_key).await.unwrap_or_default();

        let entry = CounterHistoryEntry {
            counter: name.to_string(),
            date,
            final_value,
            unique_set_snapshot: if unique_members.is_empty() {
                None
            } else {
                Some(unique_members)
            },
            metadata: serde_json::Value::Null,
            archived_at: Utc::now(),
        };
        self.durable.archive(entry).await?;
        self.atomic.set(name, 0).await?;
        self.durable.zero(name).await?;
        let _ = self.atomic.delete_set(&set_key).await;
        let _ = self.durable.delete_uniqueness_set(name, date).await;
        Ok(())
    }

    async fn purge_old_history(&self) {
        let cutoff = (Utc::now() - self.retention).with_timezone(&self.tz).date_naive();
        match self.durable.purge_history_before(cutoff).await {
            Ok(n) if n > 0 => info!(purged = n, "purged counter history older than retention"),
            Ok(_) => {}
            Err(e) => error!(error = %e, "history retention purge failed"),
        }
    }

    /// Spawn the reset-at-boundary task and the retention-purge task.
    /// Both honor `stop()`.
    pub fn spawn(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let reset_task = {
            let scheduler = self.clone();
            tokio::spawn(async move {
                loop {
                    let now = Utc::now();
                    let next = scheduler.next_boundary(now);
                    let sleep_for = (next - now).to_std().unwrap_or(std::time::Duration::ZERO);
                    tokio::select! {
                        _ = tokio::time::sleep(sleep_for) => {
                            scheduler.run_reset_once().await;
                        }
                        _ = scheduler.stop.notified() => break,
                    }
                }
            })
        };
        let purge_task = {
            let scheduler = self.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(std::time::Duration::from_secs(3600));
                loop {
                    tokio::select! {
                        _ = ticker.tick() => scheduler.purge_old_history().await,
                        _ = scheduler.stop.notified() => break,
                    }
                }
            })
        };
        vec![reset_task, purge_task]
    }

    pub fn stop(&self) {
        self.stop.notify_waiters();
    }
}
