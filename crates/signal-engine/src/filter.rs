//! Wallet filter (C2): cheap rejection of swap events from wallets that
//! aren't worth scoring.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};
use trading_core::types::swap::SwapEvent;
use trading_core::types::wallet::{FilterResult, FilterStatus};
use wallet_cache::WalletCache;

pub struct SignalFilter {
    cache: Arc<WalletCache>,
}

impl SignalFilter {
    pub fn new(cache: Arc<WalletCache>) -> Self {
        Self { cache }
    }

    pub async fn filter_signal(&self, event: &SwapEvent) -> FilterResult {
        let started = Instant::now();

        let (meta, cache_hit, _) = match self.cache.get(&event.wallet).await {
            Ok(result) => result,
            Err(e) => {
                warn!(wallet = %event.wallet, error = %e, "wallet lookup failed");
                return FilterResult {
                    status: FilterStatus::Error,
                    metadata: None,
                    lookup_ms: started.elapsed().as_millis() as u64,
                    cache_hit: false,
                };
            }
        };

        let status = if meta.is_blacklisted {
            FilterStatus::BlockedBlacklisted
        } else if !meta.is_monitored {
            debug!(wallet = %event.wallet, "wallet not monitored, discarding");
            FilterStatus::DiscardedNotMonitored
        } else {
            FilterStatus::Passed
        };

        FilterResult {
            status,
            metadata: Some(meta),
            lookup_ms: started.elapsed().as_millis() as u64,
            cache_hit,
        }
    }
}
