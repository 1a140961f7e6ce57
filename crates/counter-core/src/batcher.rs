//! `WriteBatcher`: coalesces counter deltas for durable persistence
//! (spec §4.1).
//!
//! Flush triggers on whichever comes first: buffered batch size ≥ B, or
//! oldest buffered delta's age ≥ F. Deltas for the same counter are
//! summed and applied as one row update per flush, inside a single
//! durable transaction. A fresh buffer is allocated for every flush (spec
//! §9 "batch buffer reuse" design note) and handed to its own flush task
//! so producers keep filling a new buffer while the previous one drains.

use crate::model::{QueueOp, WriteQueueEntry};
use crate::queue::WriteQueue;
use crate::traits::DurableStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

enum BatcherMsg {
    Delta { counter: String, delta: i64 },
    Flush(oneshot::Sender<()>),
}

/// Cheap, cloneable producer handle. Holding this rather than the
/// `WriteBatcher` itself is what lets `Counter::Increment` submit deltas
/// from many concurrent callers while a single owner retains the
/// `WriteBatcher` for shutdown.
#[derive(Clone)]
pub struct BatcherHandle(mpsc::Sender<BatcherMsg>);

impl BatcherHandle {
    /// Enqueue a delta. Backpressure policy is "block on full": under
    /// sustained overload callers see increased latency here rather than
    /// a dropped update (spec §5).
    pub async fn submit(&self, counter: impl Into<String>, delta: i64) {
        let _ = self
            .0
            .send(BatcherMsg::Delta {
                counter: counter.into(),
                delta,
            })
            .await;
    }
}

pub struct WriteBatcher {
    sender: mpsc::Sender<BatcherMsg>,
    join: JoinHandle<()>,
}

impl WriteBatcher {
    pub fn spawn(
        durable: Arc<dyn DurableStore>,
        queue: Arc<WriteQueue>,
        batch_size: usize,
        flush_interval: Duration,
        channel_capacity: usize,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel(channel_capacity);
        let join = tokio::spawn(async move {
            let mut buffer: HashMap<String, i64> = HashMap::new();
            let mut ticker = tokio::time::interval(flush_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    maybe_msg = rx.recv() => {
                        match maybe_msg {
                            Some(BatcherMsg::Delta { counter, delta }) => {
                                *buffer.entry(counter).or_insert(0) += delta;
                                if buffer.len() >= batch_size {
                                    let taken = std::mem::take(&mut buffer);
                                    spawn_flush(durable.clone(), queue.clone(), taken);
                                }
                            }
                            Some(BatcherMsg::Flush(ack)) => {
                                let taken = std::mem::take(&mut buffer);
                                flush(&durable, &queue, taken).await;
                                let _ = ack.send(());
                            }
                            None => {
                                let taken = std::mem::take(&mut buffer);
                                flush(&durable, &queue, taken).await;
                                break;
                            }
                        }
                    }
                    _ = ticker.tick() => {
                        if !buffer.is_empty() {
                            let taken = std::mem::take(&mut buffer);
                            spawn_flush(durable.clone(), queue.clone(), taken);
                        }
                    }
                }
            }
        });
        WriteBatcher { sender: tx, join }
    }

    /// A cloneable handle producers can hold independently of the
    /// `WriteBatcher` itself.
    pub fn handle(&self) -> BatcherHandle {
        BatcherHandle(self.sender.clone())
    }

    /// Flush whatever is buffered and stop the background task, waiting
    /// for it to drain.
    pub async fn shutdown(self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.sender.send(BatcherMsg::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
        drop(self.sender);
        let _ = self.join.await;
    }
}

fn spawn_flush(durable: Arc<dyn DurableStore>, queue: Arc<WriteQueue>, buffer: HashMap<String, i64>) {
    tokio::spawn(async move {
        flush(&durable, &queue, buffer).await;
    });
}

async fn flush(durable: &Arc<dyn DurableStore>, queue: &WriteQueue, buffer: HashMap<String, i64>) {
    if buffer.is_empty() {
        return;
    }
    let deltas: Vec<(String, i64)> = buffer.iter().map(|(k, v)| (k.clone(), *v)).collect();
    match durable.batch_upsert(&deltas).await {
        Ok(()) => debug!(n = deltas.len(), "flushed counter batch to durable tier"),
        Err(e) => {
            warn!(error = %e, n = deltas.len(), "durable flush failed, rolling batch into write queue");
            for (counter, delta) in deltas {
                let entry = WriteQueueEntry::new(counter, QueueOp::Increment, delta, None);
                if let Err(e) = queue.enqueue(entry).await {
                    warn!(error = %e, "failed to enqueue batch entry after flush failure");
                }
            }
        }
    }
}
