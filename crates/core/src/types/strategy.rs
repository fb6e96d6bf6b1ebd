//! Exit-strategy configuration model (C10) and assignment bookkeeping (C11).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One take-profit rung: at `trigger_multiplier` of entry price, sell
/// `sell_fraction` of the position's *original* entry amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeProfitLevel {
    pub trigger_multiplier: Decimal,
    pub sell_fraction: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailingStopConfig {
    pub enabled: bool,
    /// Trailing stop arms once price reaches this multiplier of entry.
    pub activation_multiplier: Decimal,
    /// Distance below the peak-since-armed price, as a fraction (e.g. 0.15 = 15%).
    pub distance_fraction: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRules {
    pub max_hold_hours: Option<u32>,
    pub stagnation_enabled: bool,
    /// Price must move by at least this percent (absolute) to reset the window.
    pub stagnation_threshold_pct: Decimal,
    pub stagnation_hours: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoonbagConfig {
    /// Fraction of the original position permanently exempted from take-profit exits.
    pub fraction: Decimal,
    pub stop_loss_fraction: Decimal,
}

/// A named, reusable exit-strategy configuration assigned to positions (C11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitStrategy {
    pub id: String,
    pub name: String,
    pub preset: String,
    pub is_default: bool,
    pub take_profit_levels: Vec<TakeProfitLevel>,
    pub stop_loss_fraction: Decimal,
    pub trailing_stop: TrailingStopConfig,
    pub time_rules: TimeRules,
    pub moonbag: Option<MoonbagConfig>,
}

impl ExitStrategy {
    /// The built-in "balanced" preset used as a fallback when no
    /// assignment rule matches and no default is configured.
    pub fn balanced_default() -> Self {
        Self {
            id: "balanced".to_string(),
            name: "Balanced".to_string(),
            preset: "balanced".to_string(),
            is_default: true,
            take_profit_levels: vec![
                TakeProfitLevel {
                    trigger_multiplier: Decimal::new(15, 1),
                    sell_fraction: Decimal::new(25, 2),
                },
                TakeProfitLevel {
                    trigger_multiplier: Decimal::new(3, 0),
                    sell_fraction: Decimal::new(25, 2),
                },
                TakeProfitLevel {
                    trigger_multiplier: Decimal::new(5, 0),
                    sell_fraction: Decimal::new(25, 2),
                },
            ],
            stop_loss_fraction: Decimal::new(25, 2),
            trailing_stop: TrailingStopConfig {
                enabled: true,
                activation_multiplier: Decimal::new(2, 0),
                distance_fraction: Decimal::new(15, 2),
            },
            time_rules: TimeRules {
                max_hold_hours: Some(48),
                stagnation_enabled: true,
                stagnation_threshold_pct: Decimal::new(5, 2),
                stagnation_hours: 6,
            },
            moonbag: Some(MoonbagConfig {
                fraction: Decimal::new(25, 2),
                stop_loss_fraction: Decimal::new(5, 1),
            }),
        }
    }

    /// A tighter-ladder, faster-trailing preset assigned to high-conviction
    /// signals by the default score mapping.
    pub fn aggressive_default() -> Self {
        Self {
            id: "aggressive".to_string(),
            name: "Aggressive".to_string(),
            preset: "aggressive".to_string(),
            is_default: false,
            take_profit_levels: vec![
                TakeProfitLevel {
                    trigger_multiplier: Decimal::new(2, 0),
                    sell_fraction: Decimal::new(2, 1),
                },
                TakeProfitLevel {
                    trigger_multiplier: Decimal::new(4, 0),
                    sell_fraction: Decimal::new(3, 1),
                },
                TakeProfitLevel {
                    trigger_multiplier: Decimal::new(8, 0),
                    sell_fraction: Decimal::new(3, 1),
                },
            ],
            stop_loss_fraction: Decimal::new(2, 1),
            trailing_stop: TrailingStopConfig {
                enabled: true,
                activation_multiplier: Decimal::new(25, 1),
                distance_fraction: Decimal::new(1, 1),
            },
            time_rules: TimeRules {
                max_hold_hours: Some(72),
                stagnation_enabled: true,
                stagnation_threshold_pct: Decimal::new(7, 2),
                stagnation_hours: 4,
            },
            moonbag: Some(MoonbagConfig {
                fraction: Decimal::new(2, 1),
                stop_loss_fraction: Decimal::new(6, 1),
            }),
        }
    }
}

/// Tracks the rolling window used to detect a stagnant position (C10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagnationWindow {
    pub window_start: DateTime<Utc>,
    pub window_start_price: Decimal,
}

impl StagnationWindow {
    pub fn start(price: Decimal) -> Self {
        Self {
            window_start: Utc::now(),
            window_start_price: price,
        }
    }

    /// Reset the window if price has moved beyond `threshold_pct` since
    /// `window_start_price`; otherwise leave it untouched.
    pub fn maybe_reset(&mut self, current_price: Decimal, threshold_pct: Decimal) {
        if self.window_start_price.is_zero() {
            return;
        }
        let change_pct = ((current_price - self.window_start_price) / self.window_start_price).abs();
        if change_pct >= threshold_pct {
            self.window_start = Utc::now();
            self.window_start_price = current_price;
        }
    }

    pub fn hours_elapsed(&self, now: DateTime<Utc>) -> f64 {
        (now - self.window_start).num_seconds() as f64 / 3600.0
    }
}

/// One rung of the score-to-strategy mapping table consulted by the
/// strategy assigner (C11) when no manual override exists. The first range
/// containing the signal score wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreStrategyRange {
    pub min_score: Decimal,
    pub max_score: Decimal,
    pub strategy_id: String,
}

/// Where a position's exit-strategy assignment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    ConvictionRule,
    ClusterRule,
    Default,
    ManualOverride,
}

/// Record of which strategy a position was assigned, and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyAssignment {
    pub position_id: Uuid,
    pub exit_strategy_id: String,
    pub source: AssignmentSource,
    pub assigned_at: DateTime<Utc>,
    pub reason: String,
}

/// An operator-initiated override of an existing assignment, logged for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualOverride {
    pub position_id: Uuid,
    pub previous_strategy_id: String,
    pub new_strategy_id: String,
    pub operator_id: String,
    pub reason: String,
    pub overridden_at: DateTime<Utc>,
}
