//! Order priority queue and lifecycle executor (C8, C9).

pub mod executor;
pub mod priority_queue;

pub use executor::{ExecutorTuning, OrderExecutor};
pub use priority_queue::{OrderPriority, OrderPriorityQueue, QueueStats};
