//! Exit-strategy assignment (C11): decides which named [`ExitStrategy`] a
//! newly opened position should be evaluated against, and lets an operator
//! override that choice later without losing the audit trail.
//!
//! Assignment priority, in order:
//! 1. A standing manual override for the position.
//! 2. The first [`ScoreStrategyRange`] in the mapping table containing the
//!    signal score.
//! 3. The per-conviction-tier default (`default_standard_strategy_id` /
//!    `default_high_strategy_id`).

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use async_trait::async_trait;
use trading_core::config::StrategyMappingConfig;
use trading_core::error::Result;
use trading_core::ports::repository::ExitStrategyRepository;
use trading_core::types::position::ConvictionTier;
use trading_core::types::strategy::{AssignmentSource, ManualOverride, StrategyAssignment};

pub struct StrategyAssigner {
    strategies: Arc<dyn ExitStrategyRepository>,
    mapping: StrategyMappingConfig,
    /// Standing manual overrides, keyed by position. Consulted before the
    /// score mapping on every assignment.
    overrides: DashMap<Uuid, String>,
}

impl StrategyAssigner {
    pub fn new(strategies: Arc<dyn ExitStrategyRepository>, mapping: StrategyMappingConfig) -> Self {
        Self {
            strategies,
            mapping,
            overrides: DashMap::new(),
        }
    }

    /// Assign and persist a strategy for a freshly opened position.
    pub async fn assign(
        &self,
        position_id: Uuid,
        signal_score: Decimal,
        conviction_tier: ConvictionTier,
    ) -> Result<StrategyAssignment> {
        let (strategy_id, source, reason) = self.resolve(position_id, signal_score, conviction_tier);

        let assignment = StrategyAssignment {
            position_id,
            exit_strategy_id: strategy_id,
            source,
            assigned_at: Utc::now(),
            reason,
        };
        self.strategies.record_assignment(&assignment).await?;
        info!(
            position_id = %position_id,
            strategy_id = %assignment.exit_strategy_id,
            source = ?assignment.source,
            "exit strategy assigned"
        );
        Ok(assignment)
    }

    /// Same resolution logic as [`Self::assign`] without touching the
    /// override cache or persisting anything, for dry-run previews.
    pub fn preview(&self, signal_score: Decimal, conviction_tier: ConvictionTier) -> (String, AssignmentSource, String) {
        self.resolve_by_score(signal_score, conviction_tier)
    }

    fn resolve(
        &self,
        position_id: Uuid,
        signal_score: Decimal,
        conviction_tier: ConvictionTier,
    ) -> (String, AssignmentSource, String) {
        if let Some(overridden) = self.overrides.get(&position_id) {
            return (
                overridden.clone(),
                AssignmentSource::ManualOverride,
                "standing manual override".to_string(),
            );
        }
        self.resolve_by_score(signal_score, conviction_tier)
    }

    fn resolve_by_score(&self, signal_score: Decimal, conviction_tier: ConvictionTier) -> (String, AssignmentSource, String) {
        if self.mapping.enabled {
            for range in &self.mapping.mappings {
                if signal_score >= range.min_score && signal_score <= range.max_score {
                    return (
                        range.strategy_id.clone(),
                        AssignmentSource::ConvictionRule,
                        format!("score {signal_score} in range [{}, {}]", range.min_score, range.max_score),
                    );
                }
            }
        }

        let default_id = match conviction_tier {
            ConvictionTier::High => self.mapping.default_high_strategy_id.clone(),
            ConvictionTier::Standard => self.mapping.default_standard_strategy_id.clone(),
        };
        (default_id, AssignmentSource::Default, "no mapping range matched, using tier default".to_string())
    }

    /// Operator-initiated override, recorded for audit and honored on every
    /// subsequent assignment lookup until cleared.
    pub async fn override_assignment(
        &self,
        position_id: Uuid,
        previous_strategy_id: String,
        new_strategy_id: String,
        operator_id: String,
        reason: String,
    ) -> Result<()> {
        self.overrides.insert(position_id, new_strategy_id.clone());

        let override_event = ManualOverride {
            position_id,
            previous_strategy_id,
            new_strategy_id,
            operator_id,
            reason,
            overridden_at: Utc::now(),
        };
        self.strategies.record_override(&override_event).await
    }

    pub fn clear_override(&self, position_id: Uuid) {
        self.overrides.remove(&position_id);
    }
}

#[async_trait]
impl trading_core::ports::ExitStrategyAssigner for StrategyAssigner {
    async fn assign(&self, position_id: Uuid, signal_score: Decimal, conviction_tier: ConvictionTier) -> Result<()> {
        self.assign(position_id, signal_score, conviction_tier).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use trading_core::types::strategy::{ExitStrategy, ScoreStrategyRange};

    #[derive(Default)]
    struct InMemoryStrategyRepo {
        assignments: Mutex<Vec<StrategyAssignment>>,
        overrides: Mutex<Vec<ManualOverride>>,
    }

    #[async_trait]
    impl ExitStrategyRepository for InMemoryStrategyRepo {
        async fn find(&self, id: &str) -> Result<Option<ExitStrategy>> {
            Ok(match id {
                "aggressive" => Some(ExitStrategy::aggressive_default()),
                "balanced" => Some(ExitStrategy::balanced_default()),
                _ => None,
            })
        }
        async fn default_strategy(&self) -> Result<ExitStrategy> {
            Ok(ExitStrategy::balanced_default())
        }
        async fn record_assignment(&self, assignment: &StrategyAssignment) -> Result<()> {
            self.assignments.lock().await.push(assignment.clone());
            Ok(())
        }
        async fn record_override(&self, override_: &ManualOverride) -> Result<()> {
            self.overrides.lock().await.push(override_.clone());
            Ok(())
        }
    }

    fn mapping() -> StrategyMappingConfig {
        StrategyMappingConfig {
            enabled: true,
            mappings: vec![ScoreStrategyRange {
                min_score: Decimal::new(85, 2),
                max_score: Decimal::ONE,
                strategy_id: "aggressive".to_string(),
            }],
            default_standard_strategy_id: "balanced".to_string(),
            default_high_strategy_id: "aggressive".to_string(),
        }
    }

    #[tokio::test]
    async fn test_high_score_maps_to_aggressive() {
        let repo = Arc::new(InMemoryStrategyRepo::default());
        let assigner = StrategyAssigner::new(repo, mapping());

        let assignment = assigner
            .assign(Uuid::new_v4(), Decimal::new(9, 1), ConvictionTier::Standard)
            .await
            .unwrap();

        assert_eq!(assignment.exit_strategy_id, "aggressive");
        assert_eq!(assignment.source, AssignmentSource::ConvictionRule);
    }

    #[tokio::test]
    async fn test_unmatched_score_falls_back_to_tier_default() {
        let repo = Arc::new(InMemoryStrategyRepo::default());
        let assigner = StrategyAssigner::new(repo, mapping());

        let assignment = assigner
            .assign(Uuid::new_v4(), Decimal::new(5, 1), ConvictionTier::Standard)
            .await
            .unwrap();

        assert_eq!(assignment.exit_strategy_id, "balanced");
        assert_eq!(assignment.source, AssignmentSource::Default);
    }

    #[tokio::test]
    async fn test_override_wins_over_score_mapping() {
        let repo = Arc::new(InMemoryStrategyRepo::default());
        let assigner = StrategyAssigner::new(repo, mapping());
        let position_id = Uuid::new_v4();

        assigner
            .override_assignment(
                position_id,
                "balanced".to_string(),
                "aggressive".to_string(),
                "ops-1".to_string(),
                "operator conviction call".to_string(),
            )
            .await
            .unwrap();

        let assignment = assigner
            .assign(position_id, Decimal::new(1, 1), ConvictionTier::Standard)
            .await
            .unwrap();

        assert_eq!(assignment.exit_strategy_id, "aggressive");
        assert_eq!(assignment.source, AssignmentSource::ManualOverride);
    }
}
