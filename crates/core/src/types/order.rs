//! Order lifecycle types for the execution engine (C8/C9).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::position::ConvictionTier;

/// Kind of order: opening a position or unwinding one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Entry,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Current state of an order. Terminal states (`Filled`, `Cancelled`) never
/// transition out; `Failed` may transition back to `Pending` via
/// `schedule_retry` iff `can_retry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Submitted,
    Confirming,
    Filled,
    Failed,
    Cancelled,
}

/// Reason an EXIT order was raised, used to compute queue sub-priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TrailingStop,
    TakeProfit,
    ManualClose,
    TimeLimit,
    Stagnation,
    Other,
}

/// An order as tracked through its full lifecycle by the executor (C9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub kind: OrderKind,
    pub side: OrderSide,
    pub token: String,
    pub amount_sol: Decimal,
    pub amount_tokens: Option<Decimal>,
    pub expected_price: Decimal,
    pub actual_price: Option<Decimal>,
    pub max_slippage_bps: u32,
    pub exit_reason: Option<ExitReason>,
    pub status: OrderStatus,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    pub tx_signature: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_simulated: bool,
    /// Position this order belongs to; `None` for a brand-new ENTRY.
    pub position_id: Option<Uuid>,
    /// Emergency flag used by the queue to force top priority regardless of kind.
    pub emergency: bool,
    /// Signal that produced this order. `Some` only for ENTRY orders: EXITs
    /// are driven by an existing position, not a fresh signal.
    pub signal_id: Option<Uuid>,
    /// Exit strategy already assigned to the position this ENTRY will open,
    /// carried on the order so the executor can open the position on fill
    /// without a second round-trip to the strategy assigner.
    pub exit_strategy_id: Option<String>,
    pub conviction_tier: Option<ConvictionTier>,
    /// Score of the signal that raised this ENTRY, carried so the executor
    /// can persist an exit-strategy assignment once a position exists.
    pub final_score: Option<Decimal>,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new_entry(
        signal_id: Uuid,
        token: String,
        amount_sol: Decimal,
        expected_price: Decimal,
        max_slippage_bps: u32,
        max_attempts: u32,
        exit_strategy_id: String,
        conviction_tier: ConvictionTier,
        final_score: Decimal,
        is_simulated: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind: OrderKind::Entry,
            side: OrderSide::Buy,
            token,
            amount_sol,
            amount_tokens: None,
            expected_price,
            actual_price: None,
            max_slippage_bps,
            exit_reason: None,
            status: OrderStatus::Pending,
            attempt_count: 0,
            max_attempts,
            last_error: None,
            tx_signature: None,
            created_at: now,
            updated_at: now,
            is_simulated,
            position_id: None,
            emergency: false,
            signal_id: Some(signal_id),
            exit_strategy_id: Some(exit_strategy_id),
            conviction_tier: Some(conviction_tier),
            final_score: Some(final_score),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_exit(
        position_id: Uuid,
        token: String,
        amount_tokens: Decimal,
        expected_price: Decimal,
        max_slippage_bps: u32,
        exit_reason: ExitReason,
        max_attempts: u32,
        is_simulated: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind: OrderKind::Exit,
            side: OrderSide::Sell,
            token,
            amount_sol: Decimal::ZERO,
            amount_tokens: Some(amount_tokens),
            expected_price,
            actual_price: None,
            max_slippage_bps,
            exit_reason: Some(exit_reason),
            status: OrderStatus::Pending,
            attempt_count: 0,
            max_attempts,
            last_error: None,
            tx_signature: None,
            created_at: now,
            updated_at: now,
            is_simulated,
            position_id: Some(position_id),
            emergency: false,
            signal_id: None,
            exit_strategy_id: None,
            conviction_tier: None,
            final_score: None,
        }
    }

    /// Whether this order is eligible for `schedule_retry` after a failure.
    pub fn can_retry(&self) -> bool {
        self.status == OrderStatus::Failed && self.attempt_count < self.max_attempts
    }

    /// Move a FAILED order back to PENDING for another attempt.
    pub fn schedule_retry(&mut self) -> bool {
        if !self.can_retry() {
            return false;
        }
        self.status = OrderStatus::Pending;
        self.updated_at = Utc::now();
        true
    }

    pub fn transition(&mut self, next: OrderStatus) -> Result<(), String> {
        match (self.status, next) {
            (OrderStatus::Filled, _) | (OrderStatus::Cancelled, _) => {
                Err(format!("cannot transition out of terminal state {:?}", self.status))
            }
            (OrderStatus::Failed, OrderStatus::Pending) => {
                Err("use schedule_retry to re-enter PENDING from FAILED".to_string())
            }
            _ => {
                self.status = next;
                self.updated_at = Utc::now();
                Ok(())
            }
        }
    }

    pub fn mark_filled(&mut self, actual_price: Decimal, tx_signature: String, amount_tokens: Option<Decimal>) -> Result<(), String> {
        self.transition(OrderStatus::Filled)?;
        self.actual_price = Some(actual_price);
        self.tx_signature = Some(tx_signature);
        if amount_tokens.is_some() {
            self.amount_tokens = amount_tokens;
        }
        Ok(())
    }

    pub fn mark_failed(&mut self, error: String) {
        self.status = OrderStatus::Failed;
        self.last_error = Some(error);
        self.attempt_count += 1;
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(max_attempts: u32) -> Order {
        Order::new_entry(
            Uuid::new_v4(),
            "token".to_string(),
            Decimal::new(1, 1),
            Decimal::new(5, 2),
            100,
            max_attempts,
            "balanced".to_string(),
            ConvictionTier::Standard,
            Decimal::new(8, 1),
            true,
        )
    }

    #[test]
    fn test_entry_lifecycle_fills() {
        let mut order = sample_entry(3);
        order.transition(OrderStatus::Submitted).unwrap();
        order.transition(OrderStatus::Confirming).unwrap();
        order
            .mark_filled(Decimal::new(5, 2), "sig".to_string(), Some(Decimal::new(2, 0)))
            .unwrap();

        assert_eq!(order.status, OrderStatus::Filled);
        assert!(order.actual_price.is_some());
        assert!(order.tx_signature.is_some());
        assert!(order.transition(OrderStatus::Failed).is_err());
    }

    #[test]
    fn test_failed_retry_respects_max_attempts() {
        let mut order = sample_entry(1);
        order.mark_failed("quote timeout".to_string());
        assert!(!order.can_retry());
        assert!(!order.schedule_retry());
    }

    #[test]
    fn test_retry_increments_attempt_and_reopens() {
        let mut order = sample_entry(3);
        order.mark_failed("transient".to_string());
        assert_eq!(order.attempt_count, 1);
        assert!(order.can_retry());
        assert!(order.schedule_retry());
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let mut order = sample_entry(3);
        order.transition(OrderStatus::Cancelled).unwrap();
        assert!(order.is_terminal());
        assert!(order.transition(OrderStatus::Submitted).is_err());
    }
}
