//! Signal scorer (C3) and threshold checker (C4).

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;
use trading_core::config::SignalConfig;
use trading_core::ports::{ClusterRepository, TokenSafety};
use trading_core::types::swap::SwapEvent;
use trading_core::types::wallet::{FilterResult, ScoredSignal};

/// Cluster-boost bounds derived from `SignalConfig::cluster_score_boost`:
/// a cluster's weight clamps to `[1.0, 1.0 + cluster_score_boost]`.
fn cluster_boost_bounds(config: &SignalConfig) -> (Decimal, Decimal) {
    (Decimal::ONE, Decimal::ONE + config.cluster_score_boost)
}

pub struct SignalScorer {
    config: Arc<SignalConfig>,
    clusters: Arc<dyn ClusterRepository>,
    token_safety: Arc<dyn TokenSafety>,
}

impl SignalScorer {
    pub fn new(
        config: Arc<SignalConfig>,
        clusters: Arc<dyn ClusterRepository>,
        token_safety: Arc<dyn TokenSafety>,
    ) -> Self {
        Self { config, clusters, token_safety }
    }

    /// Score and gate a PASSED signal. Callers should not invoke this for a
    /// `FilterResult` whose status isn't `Passed`.
    pub async fn score_and_check(&self, event: SwapEvent, filter_result: FilterResult) -> ScoredSignal {
        let meta = filter_result
            .metadata
            .expect("score_and_check requires a passed FilterResult with metadata");

        let mut wallet_score = meta.reputation;
        if meta.is_leader {
            wallet_score = (wallet_score * (Decimal::ONE + self.config.leader_score_boost)).min(Decimal::ONE);
        }

        let cluster_boost = match &meta.cluster_id {
            Some(cluster_id) => self.resolve_cluster_boost(cluster_id).await,
            None => Decimal::ONE,
        };

        let final_score = (wallet_score * cluster_boost).clamp(Decimal::ZERO, Decimal::ONE);

        let token_safe = self.token_safety.is_safe(&event.token).await.unwrap_or(false);

        // An unsafe token is a hard reject: the reported score is zeroed,
        // not just the trade decision, per the threshold gate's contract.
        let final_score = if token_safe { final_score } else { Decimal::ZERO };

        let (should_trade, position_multiplier, explanation) = if !token_safe {
            (false, Decimal::ONE, "token failed safety check".to_string())
        } else if final_score >= self.config.min_score_threshold {
            (
                true,
                cluster_boost,
                format!(
                    "score {final_score} >= threshold {}",
                    self.config.min_score_threshold
                ),
            )
        } else {
            (
                false,
                Decimal::ONE,
                format!(
                    "score {final_score} below threshold {}",
                    self.config.min_score_threshold
                ),
            )
        };

        debug!(wallet = %event.wallet, %final_score, should_trade, "signal scored");

        ScoredSignal {
            event,
            wallet_score,
            cluster_boost,
            final_score,
            token_safe,
            is_leader: meta.is_leader,
            cluster_id: meta.cluster_id,
            should_trade,
            position_multiplier,
            explanation,
        }
    }

    async fn resolve_cluster_boost(&self, cluster_id: &str) -> Decimal {
        let (min_boost, max_boost) = cluster_boost_bounds(&self.config);
        match self.clusters.cluster_weight(cluster_id).await {
            Ok(Some(weight)) => weight.clamp(min_boost, max_boost),
            Ok(None) => Decimal::ONE,
            Err(_) => Decimal::ONE,
        }
    }
}
