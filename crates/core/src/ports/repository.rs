//! Persistence ports. Concrete `sqlx`-backed implementations live alongside
//! each owning crate; core only defines the contracts so that business logic
//! never depends on a specific storage engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::types::order::Order;
use crate::types::position::Position;
use crate::types::risk::{BlockedSignal, CapitalSnapshot, CircuitBreakerTrigger, PauseResumeEvent};
use crate::types::strategy::{ExitStrategy, ManualOverride, StrategyAssignment};
use crate::types::wallet::WalletMeta;

#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn find_wallet(&self, wallet: &str) -> Result<Option<WalletMeta>>;
}

/// Resolves a wallet cluster's co-movement weight for the scorer (C3).
/// Returns `None` when the cluster is unknown or a wallet belongs to none.
#[async_trait]
pub trait ClusterRepository: Send + Sync {
    async fn cluster_weight(&self, cluster_id: &str) -> Result<Option<rust_decimal::Decimal>>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<()>;
    async fn update(&self, order: &Order) -> Result<()>;
    async fn find(&self, id: Uuid) -> Result<Option<Order>>;
}

#[async_trait]
pub trait PositionRepository: Send + Sync {
    async fn insert(&self, position: &Position) -> Result<()>;
    async fn update(&self, position: &Position) -> Result<()>;
    async fn find(&self, id: Uuid) -> Result<Option<Position>>;
    async fn find_open(&self) -> Result<Vec<Position>>;
}

/// C5: append-only log of every signal the pipeline observed, regardless of
/// whether it ultimately traded.
#[async_trait]
pub trait SignalLogRepository: Send + Sync {
    async fn log(&self, signal_id: Uuid, stage: &str, detail: serde_json::Value) -> Result<()>;
}

#[async_trait]
pub trait CapitalRepository: Send + Sync {
    async fn latest_snapshot(&self) -> Result<Option<CapitalSnapshot>>;
    async fn record_snapshot(&self, snapshot: &CapitalSnapshot) -> Result<()>;
    async fn peak_capital_since(&self, since: DateTime<Utc>) -> Result<Option<rust_decimal::Decimal>>;
}

#[async_trait]
pub trait CircuitBreakerRepository: Send + Sync {
    async fn record_trigger(&self, trigger: &CircuitBreakerTrigger) -> Result<()>;
    async fn record_pause_resume(&self, event: &PauseResumeEvent) -> Result<()>;
    /// Marks the most recent active trigger as resolved once an operator has
    /// resumed trading. Distinct from `record_pause_resume`, which logs the
    /// status transition itself.
    async fn reset_trigger(&self, id: Uuid, operator_id: &str) -> Result<()>;
}

/// C6: signals that qualified to trade but were suppressed by a tripped
/// risk gate. Distinct from `SignalLogRepository`, which records every
/// signal the pipeline observed regardless of outcome.
#[async_trait]
pub trait BlockedSignalRepository: Send + Sync {
    async fn record(&self, blocked: &BlockedSignal) -> Result<()>;
}

#[async_trait]
pub trait ExitStrategyRepository: Send + Sync {
    async fn find(&self, id: &str) -> Result<Option<ExitStrategy>>;
    async fn default_strategy(&self) -> Result<ExitStrategy>;
    async fn record_assignment(&self, assignment: &StrategyAssignment) -> Result<()>;
    async fn record_override(&self, override_: &ManualOverride) -> Result<()>;
}
