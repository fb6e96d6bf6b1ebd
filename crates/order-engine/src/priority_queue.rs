//! Priority queue for order execution (C8). EXIT orders always outrank
//! ENTRY; within EXIT, the reason determines sub-priority.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;
use trading_core::types::order::{ExitReason, Order, OrderKind};
use uuid::Uuid;

/// Priority levels; lower numeric value dequeues first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i32)]
pub enum OrderPriority {
    Emergency = 0,
    ExitStopLoss = 10,
    ExitTrailing = 20,
    ExitTakeProfit = 30,
    ExitManual = 40,
    ExitOther = 50,
    Entry = 100,
}

impl OrderPriority {
    fn name(self) -> &'static str {
        match self {
            OrderPriority::Emergency => "emergency",
            OrderPriority::ExitStopLoss => "exit_stop_loss",
            OrderPriority::ExitTrailing => "exit_trailing",
            OrderPriority::ExitTakeProfit => "exit_take_profit",
            OrderPriority::ExitManual => "exit_manual",
            OrderPriority::ExitOther => "exit_other",
            OrderPriority::Entry => "entry",
        }
    }

    const ALL: [OrderPriority; 7] = [
        OrderPriority::Emergency,
        OrderPriority::ExitStopLoss,
        OrderPriority::ExitTrailing,
        OrderPriority::ExitTakeProfit,
        OrderPriority::ExitManual,
        OrderPriority::ExitOther,
        OrderPriority::Entry,
    ];
}

/// Snapshot of queue depth per priority and recent dequeue latency.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub counts_by_priority: HashMap<&'static str, usize>,
    pub processing_count: usize,
    pub avg_wait_ms: f64,
}

fn priority_for(order: &Order) -> OrderPriority {
    if order.emergency {
        return OrderPriority::Emergency;
    }
    if order.kind != OrderKind::Exit {
        return OrderPriority::Entry;
    }
    match order.exit_reason {
        Some(ExitReason::StopLoss) => OrderPriority::ExitStopLoss,
        Some(ExitReason::TrailingStop) => OrderPriority::ExitTrailing,
        Some(ExitReason::TakeProfit) => OrderPriority::ExitTakeProfit,
        Some(ExitReason::ManualClose) => OrderPriority::ExitManual,
        _ => OrderPriority::ExitOther,
    }
}

struct QueueItem {
    priority: OrderPriority,
    created_at_epoch_micros: i64,
    order: Order,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.created_at_epoch_micros == other.created_at_epoch_micros
    }
}
impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    /// `BinaryHeap` is a max-heap; invert so that lower priority values and
    /// earlier timestamps surface first.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.created_at_epoch_micros.cmp(&self.created_at_epoch_micros))
    }
}

struct Inner {
    heap: BinaryHeap<QueueItem>,
    processing: HashSet<Uuid>,
    /// Rolling window of recent dequeue wait times, in milliseconds.
    recent_wait_ms: VecDeque<f64>,
}

const WAIT_WINDOW: usize = 200;

/// Bounded-concurrency priority queue guarding order dispatch to the
/// executor (C9). All operations are guarded by a single mutex; no lock is
/// held across an `.await` outside this module.
pub struct OrderPriorityQueue {
    inner: Mutex<Inner>,
    max_concurrent: usize,
}

impl OrderPriorityQueue {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                processing: HashSet::new(),
                recent_wait_ms: VecDeque::with_capacity(WAIT_WINDOW),
            }),
            max_concurrent,
        }
    }

    pub async fn enqueue(&self, order: Order) {
        let priority = priority_for(&order);
        let mut inner = self.inner.lock().await;
        debug!(order_id = %order.id, ?priority, "order enqueued");
        inner.heap.push(QueueItem {
            priority,
            created_at_epoch_micros: order.created_at.timestamp_micros(),
            order,
        });
    }

    /// Pop the next order to process, respecting the concurrency cap.
    /// Returns `None` if no slots are free or the queue is empty.
    pub async fn dequeue(&self) -> Option<Order> {
        let mut inner = self.inner.lock().await;
        if inner.processing.len() >= self.max_concurrent {
            return None;
        }
        let item = inner.heap.pop()?;
        let wait_ms = (Utc::now().timestamp_micros() - item.created_at_epoch_micros) as f64 / 1000.0;
        if inner.recent_wait_ms.len() >= WAIT_WINDOW {
            inner.recent_wait_ms.pop_front();
        }
        inner.recent_wait_ms.push_back(wait_ms.max(0.0));
        inner.processing.insert(item.order.id);
        Some(item.order)
    }

    pub async fn mark_complete(&self, order_id: Uuid) {
        let mut inner = self.inner.lock().await;
        inner.processing.remove(&order_id);
    }

    /// Remove a still-queued order by id, used only for cancellations.
    /// O(n): rebuilds the heap without the matching item.
    pub async fn remove(&self, order_id: Uuid) -> Option<Order> {
        let mut inner = self.inner.lock().await;
        let items: Vec<QueueItem> = std::mem::take(&mut inner.heap).into_vec();
        let mut removed = None;
        let mut rebuilt = BinaryHeap::with_capacity(items.len());
        for item in items {
            if removed.is_none() && item.order.id == order_id {
                removed = Some(item.order);
            } else {
                rebuilt.push(item);
            }
        }
        inner.heap = rebuilt;
        removed
    }

    /// Clone of the next order that would be dequeued, without removing it
    /// or consuming a concurrency slot.
    pub async fn peek(&self) -> Option<Order> {
        self.inner.lock().await.heap.peek().map(|item| item.order.clone())
    }

    pub async fn contains(&self, order_id: Uuid) -> bool {
        let inner = self.inner.lock().await;
        inner.processing.contains(&order_id) || inner.heap.iter().any(|item| item.order.id == order_id)
    }

    /// Drop every still-queued order. In-flight (processing) orders are
    /// untouched.
    pub async fn clear(&self) {
        self.inner.lock().await.heap.clear();
    }

    pub async fn stats(&self) -> QueueStats {
        let inner = self.inner.lock().await;
        let mut counts_by_priority = HashMap::new();
        for priority in OrderPriority::ALL {
            counts_by_priority.insert(priority.name(), 0usize);
        }
        for item in inner.heap.iter() {
            *counts_by_priority.entry(item.priority.name()).or_insert(0) += 1;
        }

        let avg_wait_ms = if inner.recent_wait_ms.is_empty() {
            0.0
        } else {
            inner.recent_wait_ms.iter().sum::<f64>() / inner.recent_wait_ms.len() as f64
        };

        QueueStats {
            counts_by_priority,
            processing_count: inner.processing.len(),
            avg_wait_ms,
        }
    }

    pub async fn queue_len(&self) -> usize {
        self.inner.lock().await.heap.len()
    }

    pub async fn processing_count(&self) -> usize {
        self.inner.lock().await.processing.len()
    }

    pub async fn available_slots(&self) -> usize {
        let inner = self.inner.lock().await;
        self.max_concurrent.saturating_sub(inner.processing.len())
    }
}
