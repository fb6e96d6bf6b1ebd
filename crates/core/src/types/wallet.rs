//! Wallet metadata cache entries and signal scoring output.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::swap::SwapEvent;

/// Cached metadata describing a wallet's monitoring/reputation state.
///
/// Produced on cache miss by a repository fetch (C1); a missing wallet is
/// cached as `{is_monitored: false}` to avoid stampeding the repository on
/// repeated lookups for unknown addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletMeta {
    pub wallet: String,
    pub is_monitored: bool,
    pub is_blacklisted: bool,
    /// Wallet-quality reputation, already normalized to [0, 1].
    pub reputation: Decimal,
    pub cluster_id: Option<String>,
    pub is_leader: bool,
    pub cached_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl WalletMeta {
    pub fn unknown(wallet: String, ttl: Duration) -> Self {
        Self {
            wallet,
            is_monitored: false,
            is_blacklisted: false,
            reputation: Decimal::ZERO,
            cluster_id: None,
            is_leader: false,
            cached_at: Utc::now(),
            ttl,
        }
    }

    /// `expired ⇔ now − cached_at ≥ ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero());
        now - self.cached_at >= ttl
    }
}

/// Outcome of passing a `SwapEvent` through the wallet filter (C2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStatus {
    Passed,
    DiscardedNotMonitored,
    BlockedBlacklisted,
    Error,
}

/// Result of `filter_signal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResult {
    pub status: FilterStatus,
    pub metadata: Option<WalletMeta>,
    pub lookup_ms: u64,
    pub cache_hit: bool,
}

/// A swap event enriched with a wallet-quality score and trade decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredSignal {
    pub event: SwapEvent,
    pub wallet_score: Decimal,
    pub cluster_boost: Decimal,
    pub final_score: Decimal,
    pub token_safe: bool,
    pub is_leader: bool,
    pub cluster_id: Option<String>,
    pub should_trade: bool,
    pub position_multiplier: Decimal,
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_meta_expiry() {
        let meta = WalletMeta {
            wallet: "w".to_string(),
            is_monitored: true,
            is_blacklisted: false,
            reputation: Decimal::new(8, 1),
            cluster_id: None,
            is_leader: false,
            cached_at: Utc::now() - chrono::Duration::seconds(400),
            ttl: Duration::from_secs(300),
        };

        assert!(meta.is_expired(Utc::now()));
        assert!(!meta.is_expired(Utc::now() - chrono::Duration::seconds(350)));
    }

    #[test]
    fn test_unknown_wallet_defaults() {
        let meta = WalletMeta::unknown("w".to_string(), Duration::from_secs(300));
        assert!(!meta.is_monitored);
        assert!(!meta.is_blacklisted);
    }
}
