//! Capital tracking and circuit-breaker state for the risk manager (C6, C12).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A point-in-time snapshot of total capital, used to derive daily loss and
/// drawdown from a monotonic peak watermark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalSnapshot {
    pub id: Uuid,
    pub total_capital_sol: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// Rolling daily P&L metrics, reset at the start of each trading day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyLossMetrics {
    pub day_start_capital_sol: Decimal,
    pub current_capital_sol: Decimal,
    pub realized_pnl_sol: Decimal,
    pub daily_loss_pct: Decimal,
    pub warning_threshold_pct: Decimal,
    pub limit_pct: Decimal,
}

impl DailyLossMetrics {
    pub fn is_in_warning_zone(&self) -> bool {
        self.daily_loss_pct >= self.warning_threshold_pct
    }

    pub fn is_over_limit(&self) -> bool {
        self.daily_loss_pct >= self.limit_pct
    }
}

/// Why the circuit breaker opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    DailyLossLimit,
    DrawdownLimit,
    ManualHalt,
}

/// An entry in the circuit-breaker audit trail. Entry-only: the breaker
/// never blocks EXIT orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerTrigger {
    pub id: Uuid,
    pub reason: TriggerReason,
    pub metric_value_pct: Decimal,
    pub limit_pct: Decimal,
    pub triggered_at: DateTime<Utc>,
    /// False once an operator has reset this trigger via the resume path.
    pub active: bool,
}

/// Overall entry-trading status, surfaced to operators and to the sizing gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    Running,
    PausedManual,
    PausedCircuitBreaker,
}

/// Reason a pause was requested, independent of the resulting status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    Operator,
    DailyLossLimit,
    DrawdownLimit,
}

/// Why an otherwise-qualifying ENTRY signal never became an order (C6).
/// Recorded instead of silently dropping the signal, so an operator can see
/// what the risk gate suppressed while it was tripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedSignal {
    pub id: Uuid,
    pub signal_id: Uuid,
    pub wallet: String,
    pub token: String,
    pub final_score: Decimal,
    pub reason: TriggerReason,
    pub blocked_at: DateTime<Utc>,
}

/// Audit trail entry for a pause or resume transition (C12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseResumeEvent {
    pub id: Uuid,
    pub event_type: String,
    pub operator_id: Option<String>,
    pub previous_status: SystemStatus,
    pub new_status: SystemStatus,
    pub reason: Option<PauseReason>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}
