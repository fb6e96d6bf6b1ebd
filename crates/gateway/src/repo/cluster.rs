//! C3 cluster co-movement weight lookup.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use trading_core::error::Result;
use trading_core::ports::ClusterRepository;

pub struct PgClusterRepository {
    pool: PgPool,
}

impl PgClusterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClusterRepository for PgClusterRepository {
    async fn cluster_weight(&self, cluster_id: &str) -> Result<Option<Decimal>> {
        let row = sqlx::query("SELECT weight FROM wallet_clusters WHERE id = $1")
            .bind(cluster_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("weight")))
    }
}
