//! C10 open-position persistence.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use trading_core::error::{Error, Result};
use trading_core::ports::PositionRepository;
use trading_core::types::position::{ConvictionTier, Position, PositionStatus};
use uuid::Uuid;

pub struct PgPositionRepository {
    pool: PgPool,
}

impl PgPositionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_json(value: impl serde::Serialize) -> String {
    serde_json::to_string(&value).unwrap_or_default()
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(Error::Json)
}

#[async_trait]
impl PositionRepository for PgPositionRepository {
    async fn insert(&self, position: &Position) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO positions (
                id, signal_id, token, entry_price, entry_amount_sol, entry_amount_tokens,
                current_amount_tokens, status, exit_strategy_id, conviction_tier,
                entry_time, closed_at, realized_pnl_sol, is_simulated
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(position.id)
        .bind(position.signal_id)
        .bind(&position.token)
        .bind(position.entry_price)
        .bind(position.entry_amount_sol)
        .bind(position.entry_amount_tokens)
        .bind(position.current_amount_tokens)
        .bind(to_json(position.status))
        .bind(&position.exit_strategy_id)
        .bind(to_json(position.conviction_tier))
        .bind(position.entry_time)
        .bind(position.closed_at)
        .bind(position.realized_pnl_sol)
        .bind(position.is_simulated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, position: &Position) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE positions SET
                current_amount_tokens = $2, status = $3, closed_at = $4, realized_pnl_sol = $5
            WHERE id = $1
            "#,
        )
        .bind(position.id)
        .bind(position.current_amount_tokens)
        .bind(to_json(position.status))
        .bind(position.closed_at)
        .bind(position.realized_pnl_sol)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Position>> {
        let row = sqlx::query("SELECT * FROM positions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_position).transpose()
    }

    async fn find_open(&self) -> Result<Vec<Position>> {
        let rows = sqlx::query("SELECT * FROM positions WHERE status != $1")
            .bind(to_json(PositionStatus::Closed))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_position).collect()
    }
}

fn row_to_position(r: sqlx::postgres::PgRow) -> Result<Position> {
    let status: String = r.get("status");
    let conviction_tier: String = r.get("conviction_tier");

    Ok(Position {
        id: r.get("id"),
        signal_id: r.get("signal_id"),
        token: r.get("token"),
        entry_price: r.get("entry_price"),
        entry_amount_sol: r.get("entry_amount_sol"),
        entry_amount_tokens: r.get("entry_amount_tokens"),
        current_amount_tokens: r.get("current_amount_tokens"),
        status: from_json::<PositionStatus>(&status)?,
        exit_strategy_id: r.get("exit_strategy_id"),
        conviction_tier: from_json::<ConvictionTier>(&conviction_tier)?,
        entry_time: r.get("entry_time"),
        closed_at: r.get("closed_at"),
        realized_pnl_sol: r.get("realized_pnl_sol"),
        is_simulated: r.get("is_simulated"),
    })
}
