//! C9 order lifecycle persistence.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use trading_core::error::{Error, Result};
use trading_core::ports::OrderRepository;
use trading_core::types::order::{ExitReason, Order, OrderKind, OrderSide, OrderStatus};
use trading_core::types::position::ConvictionTier;
use uuid::Uuid;

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
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
impl OrderRepository for PgOrderRepository {
    async fn insert(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, kind, side, token, amount_sol, amount_tokens, expected_price,
                actual_price, max_slippage_bps, exit_reason, status, attempt_count,
                max_attempts, last_error, tx_signature, created_at, updated_at,
                is_simulated, position_id, emergency, signal_id, exit_strategy_id,
                conviction_tier
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23
            )
            "#,
        )
        .bind(order.id)
        .bind(to_json(order.kind))
        .bind(to_json(order.side))
        .bind(&order.token)
        .bind(order.amount_sol)
        .bind(order.amount_tokens)
        .bind(order.expected_price)
        .bind(order.actual_price)
        .bind(order.max_slippage_bps as i32)
        .bind(order.exit_reason.map(to_json))
        .bind(to_json(order.status))
        .bind(order.attempt_count as i32)
        .bind(order.max_attempts as i32)
        .bind(&order.last_error)
        .bind(&order.tx_signature)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.is_simulated)
        .bind(order.position_id)
        .bind(order.emergency)
        .bind(order.signal_id)
        .bind(&order.exit_strategy_id)
        .bind(order.conviction_tier.map(to_json))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders SET
                status = $2, actual_price = $3, attempt_count = $4, last_error = $5,
                tx_signature = $6, updated_at = $7, amount_tokens = $8
            WHERE id = $1
            "#,
        )
        .bind(order.id)
        .bind(to_json(order.status))
        .bind(order.actual_price)
        .bind(order.attempt_count as i32)
        .bind(&order.last_error)
        .bind(&order.tx_signature)
        .bind(order.updated_at)
        .bind(order.amount_tokens)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_order).transpose()
    }
}

fn row_to_order(r: sqlx::postgres::PgRow) -> Result<Order> {
    let kind: String = r.get("kind");
    let side: String = r.get("side");
    let status: String = r.get("status");
    let exit_reason: Option<String> = r.get("exit_reason");
    let conviction_tier: Option<String> = r.get("conviction_tier");

    Ok(Order {
        id: r.get("id"),
        kind: from_json::<OrderKind>(&kind)?,
        side: from_json::<OrderSide>(&side)?,
        token: r.get("token"),
        amount_sol: r.get("amount_sol"),
        amount_tokens: r.get("amount_tokens"),
        expected_price: r.get("expected_price"),
        actual_price: r.get("actual_price"),
        max_slippage_bps: r.get::<i32, _>("max_slippage_bps") as u32,
        exit_reason: exit_reason.map(|s| from_json::<ExitReason>(&s)).transpose()?,
        status: from_json::<OrderStatus>(&status)?,
        attempt_count: r.get::<i32, _>("attempt_count") as u32,
        max_attempts: r.get::<i32, _>("max_attempts") as u32,
        last_error: r.get("last_error"),
        tx_signature: r.get("tx_signature"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
        is_simulated: r.get("is_simulated"),
        position_id: r.get("position_id"),
        emergency: r.get("emergency"),
        signal_id: r.get("signal_id"),
        exit_strategy_id: r.get("exit_strategy_id"),
        conviction_tier: conviction_tier.map(|s| from_json::<ConvictionTier>(&s)).transpose()?,
    })
}
