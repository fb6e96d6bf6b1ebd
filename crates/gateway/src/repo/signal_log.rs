//! C5 append-only signal log persistence.

use async_trait::async_trait;
use sqlx::PgPool;
use trading_core::error::Result;
use trading_core::ports::SignalLogRepository;
use uuid::Uuid;

pub struct PgSignalLogRepository {
    pool: PgPool,
}

impl PgSignalLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SignalLogRepository for PgSignalLogRepository {
    async fn log(&self, signal_id: Uuid, stage: &str, detail: serde_json::Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO signal_logs (id, signal_id, stage, detail, recorded_at) VALUES ($1, $2, $3, $4, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(signal_id)
        .bind(stage)
        .bind(detail)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
