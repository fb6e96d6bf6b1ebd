//! Async signal log (C5): bounded queue with a background batch flusher.
//!
//! `log()` is a non-blocking enqueue; a background task drains the queue on
//! a size or time trigger and persists through the repository port.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{error, warn};
use trading_core::ports::SignalLogRepository;
use uuid::Uuid;

#[derive(Clone)]
struct LogEntry {
    signal_id: Uuid,
    stage: String,
    detail: Value,
    retry_count: u32,
}

struct Inner {
    queue: VecDeque<LogEntry>,
    dropped_since_warning: bool,
}

pub struct SignalLog {
    inner: Mutex<Inner>,
    notify: Notify,
    capacity: usize,
    batch_size: usize,
    flush_interval: Duration,
    max_flush_retries: u32,
    repo: Arc<dyn SignalLogRepository>,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl SignalLog {
    pub fn new(
        repo: Arc<dyn SignalLogRepository>,
        capacity: usize,
        batch_size: usize,
        flush_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner { queue: VecDeque::with_capacity(capacity), dropped_since_warning: false }),
            notify: Notify::new(),
            capacity,
            batch_size,
            flush_interval,
            max_flush_retries: 3,
            repo,
            flusher: Mutex::new(None),
        })
    }

    /// Non-blocking enqueue. Drops the oldest entry when at capacity, with
    /// one warning per overflow burst rather than one per drop.
    pub async fn log(&self, signal_id: Uuid, stage: impl Into<String>, detail: Value) {
        let mut inner = self.inner.lock().await;
        if inner.queue.len() >= self.capacity {
            inner.queue.pop_front();
            if !inner.dropped_since_warning {
                warn!(capacity = self.capacity, "signal log at capacity, dropping oldest entries");
                inner.dropped_since_warning = true;
            }
        } else {
            inner.dropped_since_warning = false;
        }

        inner.queue.push_back(LogEntry { signal_id, stage: stage.into(), detail, retry_count: 0 });
        let should_wake = inner.queue.len() >= self.batch_size;
        drop(inner);

        if should_wake {
            self.notify.notify_one();
        }
    }

    pub async fn start(self: &Arc<Self>) {
        let mut guard = self.flusher.lock().await;
        if guard.is_some() {
            return;
        }
        let this = Arc::clone(self);
        *guard = Some(tokio::spawn(async move { this.flush_loop().await }));
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.flusher.lock().await.take() {
            handle.abort();
        }
        self.flush_remaining().await;
    }

    async fn flush_loop(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(self.flush_interval) => {}
            }
            self.flush_batch().await;
        }
    }

    async fn flush_batch(&self) {
        let batch = {
            let mut inner = self.inner.lock().await;
            let n = inner.queue.len().min(self.batch_size.max(1));
            inner.queue.drain(..n).collect::<Vec<_>>()
        };

        for entry in batch {
            self.flush_one(entry).await;
        }
    }

    async fn flush_one(&self, mut entry: LogEntry) {
        if let Err(e) = self.repo.log(entry.signal_id, &entry.stage, entry.detail.clone()).await {
            entry.retry_count += 1;
            if entry.retry_count <= self.max_flush_retries {
                warn!(signal_id = %entry.signal_id, error = %e, retry_count = entry.retry_count, "signal log flush failed, re-enqueuing");
                self.inner.lock().await.queue.push_back(entry);
            } else {
                error!(signal_id = %entry.signal_id, "signal log entry exhausted flush retries, dropping");
            }
        }
    }

    async fn flush_remaining(&self) {
        loop {
            let len = self.inner.lock().await.queue.len();
            if len == 0 {
                break;
            }
            self.flush_batch().await;
        }
    }

    pub async fn queue_len(&self) -> usize {
        self.inner.lock().await.queue.len()
    }
}
