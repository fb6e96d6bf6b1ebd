//! Open-position tracking types, driven by the exit-strategy monitor (C10).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse conviction bucket used for sizing and strategy assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvictionTier {
    Standard,
    High,
}

/// Lifecycle state of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Open,
    PartialExit,
    Closed,
}

/// A held position, owned by the exit monitor (C10) while OPEN; the
/// executor (C9) mutates it only through FILLED transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub signal_id: Uuid,
    pub token: String,
    pub entry_price: Decimal,
    pub entry_amount_sol: Decimal,
    pub entry_amount_tokens: Decimal,
    pub current_amount_tokens: Decimal,
    pub status: PositionStatus,
    pub exit_strategy_id: String,
    pub conviction_tier: ConvictionTier,
    pub entry_time: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub realized_pnl_sol: Decimal,
    pub is_simulated: bool,
}

impl Position {
    pub fn open(
        signal_id: Uuid,
        token: String,
        entry_price: Decimal,
        entry_amount_sol: Decimal,
        entry_amount_tokens: Decimal,
        exit_strategy_id: String,
        conviction_tier: ConvictionTier,
        is_simulated: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            signal_id,
            token,
            entry_price,
            entry_amount_sol,
            entry_amount_tokens,
            current_amount_tokens: entry_amount_tokens,
            status: PositionStatus::Open,
            exit_strategy_id,
            conviction_tier,
            entry_time: Utc::now(),
            closed_at: None,
            realized_pnl_sol: Decimal::ZERO,
            is_simulated,
        }
    }

    /// Cost basis (SOL) of a fraction of the original entry.
    pub fn cost_basis_for_fraction(&self, fraction: Decimal) -> Decimal {
        self.entry_amount_sol * fraction
    }

    /// Apply proceeds from a filled EXIT order, reducing held tokens and
    /// rolling the realized PnL of the sold fraction into the position.
    pub fn apply_exit_fill(&mut self, tokens_sold: Decimal, proceeds_sol: Decimal) {
        let fraction = if self.entry_amount_tokens.is_zero() {
            Decimal::ZERO
        } else {
            tokens_sold / self.entry_amount_tokens
        };
        let cost_basis = self.cost_basis_for_fraction(fraction);
        self.realized_pnl_sol += proceeds_sol - cost_basis;
        self.current_amount_tokens -= tokens_sold;

        if self.current_amount_tokens <= Decimal::ZERO {
            self.current_amount_tokens = Decimal::ZERO;
            self.status = PositionStatus::Closed;
            self.closed_at = Some(Utc::now());
        } else {
            self.status = PositionStatus::PartialExit;
        }
    }

    pub fn unrealized_pnl_sol(&self, current_price: Decimal) -> Decimal {
        let remaining_fraction = if self.entry_amount_tokens.is_zero() {
            Decimal::ZERO
        } else {
            self.current_amount_tokens / self.entry_amount_tokens
        };
        let remaining_cost_basis = self.cost_basis_for_fraction(remaining_fraction);
        let current_value = self.current_amount_tokens * current_price;
        current_value - remaining_cost_basis
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, PositionStatus::Open | PositionStatus::PartialExit)
    }
}
