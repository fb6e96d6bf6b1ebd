//! Risk-gated position sizing (C7).

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;
use trading_core::config::SizingConfig;
use trading_core::types::position::ConvictionTier;
use trading_core::types::sizing::{SizingAudit, SizingDecision, SizingOutcome};
use trading_core::types::wallet::ScoredSignal;
use uuid::Uuid;

pub struct PositionSizer {
    config: Arc<SizingConfig>,
    circuit_breaker: Arc<risk_manager::CircuitBreaker>,
}

impl PositionSizer {
    pub fn new(config: Arc<SizingConfig>, circuit_breaker: Arc<risk_manager::CircuitBreaker>) -> Self {
        Self { config, circuit_breaker }
    }

    pub fn size(
        &self,
        signal: &ScoredSignal,
        available_balance_sol: Decimal,
        current_position_count: usize,
        current_allocated_sol: Decimal,
    ) -> SizingDecision {
        let cfg = &self.config;

        if !self.circuit_breaker.entry_allowed() {
            return reject(SizingOutcome::RejectedTradingPaused, "entry trading currently paused by risk gate");
        }

        if !signal.should_trade {
            return reject(SizingOutcome::SkippedLowScore, &signal.explanation);
        }

        if signal.final_score < cfg.min_conviction_threshold {
            return reject(
                SizingOutcome::SkippedLowScore,
                &format!(
                    "final_score {} below min_conviction_threshold {}",
                    signal.final_score, cfg.min_conviction_threshold
                ),
            );
        }

        if current_position_count >= cfg.max_concurrent_positions {
            return reject(
                SizingOutcome::SkippedMaxPositions,
                &format!("position count {current_position_count} at max {}", cfg.max_concurrent_positions),
            );
        }

        let (tier, multiplier) = if signal.final_score >= cfg.high_conviction_threshold {
            (ConvictionTier::High, cfg.high_conviction_multiplier)
        } else {
            (ConvictionTier::Standard, Decimal::ONE)
        };

        let total_capital = available_balance_sol + current_allocated_sol;
        let cap = total_capital * (cfg.max_exposure_pct / Decimal::new(100, 0));
        let usable = (available_balance_sol - cfg.reserve_sol).max(Decimal::ZERO);
        let budget = usable.min((cap - current_allocated_sol).max(Decimal::ZERO));

        let base_amount_sol = (budget * cfg.base_position_pct).min(budget);
        let calculated = base_amount_sol * multiplier;

        debug!(?tier, %calculated, %budget, "position sized");

        if calculated > cfg.max_position_sol {
            return SizingDecision {
                outcome: SizingOutcome::Reduced,
                base_amount_sol,
                final_amount_sol: cfg.max_position_sol,
                position_multiplier: multiplier,
                explanation: format!("calculated {calculated} reduced to max_position_sol {}", cfg.max_position_sol),
            };
        }

        if calculated < cfg.min_position_sol {
            if cfg.reduce_below_min {
                return SizingDecision {
                    outcome: SizingOutcome::Reduced,
                    base_amount_sol,
                    final_amount_sol: cfg.min_position_sol,
                    position_multiplier: multiplier,
                    explanation: format!(
                        "calculated {calculated} below min_position_sol, raised to floor {}",
                        cfg.min_position_sol
                    ),
                };
            }
            return reject(
                SizingOutcome::SkippedMinSize,
                &format!("calculated {calculated} below min_position_sol {}", cfg.min_position_sol),
            );
        }

        SizingDecision {
            outcome: SizingOutcome::Approved,
            base_amount_sol,
            final_amount_sol: calculated,
            position_multiplier: multiplier,
            explanation: format!("approved at {calculated} SOL ({tier:?} conviction)"),
        }
    }

    pub fn audit(
        &self,
        signal_id: Uuid,
        decision: SizingDecision,
        current_exposure_sol: Decimal,
        current_capital_sol: Decimal,
    ) -> SizingAudit {
        SizingAudit {
            id: Uuid::new_v4(),
            signal_id,
            decision,
            current_exposure_sol,
            current_capital_sol,
            decided_at: Utc::now(),
        }
    }
}

fn reject(outcome: SizingOutcome, explanation: &str) -> SizingDecision {
    SizingDecision {
        outcome,
        base_amount_sol: Decimal::ZERO,
        final_amount_sol: Decimal::ZERO,
        position_multiplier: Decimal::ONE,
        explanation: explanation.to_string(),
    }
}
