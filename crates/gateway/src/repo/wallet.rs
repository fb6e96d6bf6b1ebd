//! C1 wallet metadata lookup.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use trading_core::error::Result;
use trading_core::ports::WalletRepository;
use trading_core::types::wallet::WalletMeta;

pub struct PgWalletRepository {
    pool: PgPool,
}

impl PgWalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletRepository for PgWalletRepository {
    async fn find_wallet(&self, wallet: &str) -> Result<Option<WalletMeta>> {
        let row = sqlx::query(
            r#"
            SELECT address, is_monitored, is_blacklisted, reputation, cluster_id,
                   is_leader, cache_ttl_seconds
            FROM wallets
            WHERE address = $1
            "#,
        )
        .bind(wallet)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let ttl_seconds: i64 = r.try_get("cache_ttl_seconds").unwrap_or(300);
            WalletMeta {
                wallet: r.get("address"),
                is_monitored: r.get("is_monitored"),
                is_blacklisted: r.get("is_blacklisted"),
                reputation: r.try_get::<Decimal, _>("reputation").unwrap_or(Decimal::ZERO),
                cluster_id: r.get("cluster_id"),
                is_leader: r.get("is_leader"),
                cached_at: chrono::Utc::now(),
                ttl: std::time::Duration::from_secs(ttl_seconds.max(0) as u64),
            }
        }))
    }
}
