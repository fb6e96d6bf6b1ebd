//! Position-sizing decisions (C7).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal outcome of the position-sizer pipeline; the first matching step
/// wins, so only one of these applies per decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingOutcome {
    Approved,
    /// Clamped down to `max_position_sol`.
    Reduced,
    RejectedTradingPaused,
    SkippedLowScore,
    SkippedMaxPositions,
    SkippedMinSize,
}

/// Result of running a scored signal through the position sizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingDecision {
    pub outcome: SizingOutcome,
    pub base_amount_sol: Decimal,
    pub final_amount_sol: Decimal,
    pub position_multiplier: Decimal,
    pub explanation: String,
}

impl SizingDecision {
    pub fn is_sizeable(&self) -> bool {
        matches!(self.outcome, SizingOutcome::Approved | SizingOutcome::Reduced)
    }
}

/// Audit record persisted alongside each sizing decision for later review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingAudit {
    pub id: Uuid,
    pub signal_id: Uuid,
    pub decision: SizingDecision,
    pub current_exposure_sol: Decimal,
    pub current_capital_sol: Decimal,
    pub decided_at: DateTime<Utc>,
}
