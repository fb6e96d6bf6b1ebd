//! In-process TTL cache over wallet metadata (C1).
//!
//! A cache miss or expired entry falls through to the `WalletRepository`
//! port; the repository's answer (including "wallet unknown") is cached so
//! repeated lookups for the same address never repeat the fetch within the
//! TTL window.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;
use trading_core::error::Result;
use trading_core::ports::WalletRepository;
use trading_core::types::wallet::WalletMeta;

pub struct WalletCache {
    entries: DashMap<String, WalletMeta>,
    repo: Arc<dyn WalletRepository>,
    ttl: Duration,
    max_entries: usize,
}

impl WalletCache {
    pub fn new(repo: Arc<dyn WalletRepository>, ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            repo,
            ttl,
            max_entries,
        }
    }

    /// Look up wallet metadata, measuring round-trip latency for the caller
    /// to fold into `FilterResult::lookup_ms`.
    pub async fn get(&self, wallet: &str) -> Result<(WalletMeta, bool, Duration)> {
        let started = Instant::now();
        let now = chrono::Utc::now();

        if let Some(entry) = self.entries.get(wallet) {
            if !entry.is_expired(now) {
                return Ok((entry.clone(), true, started.elapsed()));
            }
        }

        let meta = match self.repo.find_wallet(wallet).await? {
            Some(mut meta) => {
                meta.cached_at = now;
                meta.ttl = self.ttl;
                meta
            }
            None => WalletMeta::unknown(wallet.to_string(), self.ttl),
        };

        self.insert(wallet.to_string(), meta.clone());
        Ok((meta, false, started.elapsed()))
    }

    fn insert(&self, wallet: String, meta: WalletMeta) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&wallet) {
            self.evict_oldest();
        }
        self.entries.insert(wallet, meta);
    }

    /// Linear scan eviction. The cache is sized in the tens of thousands of
    /// entries; a heap-based LRU isn't warranted at that scale.
    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.cached_at)
            .map(|e| e.key().clone());

        if let Some(key) = oldest {
            debug!(wallet = %key, "evicting oldest cache entry to respect max_entries");
            self.entries.remove(&key);
        }
    }

    pub fn invalidate(&self, wallet: &str) {
        self.entries.remove(wallet);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
