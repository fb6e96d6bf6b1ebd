//! `sqlx`-backed persistence for capital snapshots and the circuit-breaker
//! audit trail (triggers, pause/resume events).

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;
use trading_core::error::Result;
use trading_core::ports::{BlockedSignalRepository, CapitalRepository, CircuitBreakerRepository};
use trading_core::types::risk::{
    BlockedSignal, CapitalSnapshot, CircuitBreakerTrigger, PauseResumeEvent, TriggerReason,
};

pub struct PgCapitalRepository {
    pool: PgPool,
}

impl PgCapitalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CapitalRepository for PgCapitalRepository {
    async fn latest_snapshot(&self) -> Result<Option<CapitalSnapshot>> {
        let row = sqlx::query(
            "SELECT id, total_capital_sol, recorded_at FROM capital_snapshots ORDER BY recorded_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| CapitalSnapshot {
            id: r.get("id"),
            total_capital_sol: r.get("total_capital_sol"),
            recorded_at: r.get("recorded_at"),
        }))
    }

    async fn record_snapshot(&self, snapshot: &CapitalSnapshot) -> Result<()> {
        sqlx::query(
            "INSERT INTO capital_snapshots (id, total_capital_sol, recorded_at) VALUES ($1, $2, $3)",
        )
        .bind(snapshot.id)
        .bind(snapshot.total_capital_sol)
        .bind(snapshot.recorded_at)
        .execute(&self.pool)
        .await?;
        debug!(total_capital_sol = %snapshot.total_capital_sol, "recorded capital snapshot");
        Ok(())
    }

    async fn peak_capital_since(&self, since: chrono::DateTime<chrono::Utc>) -> Result<Option<rust_decimal::Decimal>> {
        let row = sqlx::query(
            "SELECT MAX(total_capital_sol) AS peak FROM capital_snapshots WHERE recorded_at >= $1",
        )
        .bind(since)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|r| r.get("peak")))
    }
}

pub struct PgCircuitBreakerRepository {
    pool: PgPool,
}

impl PgCircuitBreakerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn reason_to_string(reason: &TriggerReason) -> &'static str {
        match reason {
            TriggerReason::DailyLossLimit => "daily_loss_limit",
            TriggerReason::DrawdownLimit => "drawdown_limit",
            TriggerReason::ManualHalt => "manual_halt",
        }
    }
}

#[async_trait]
impl CircuitBreakerRepository for PgCircuitBreakerRepository {
    async fn record_trigger(&self, trigger: &CircuitBreakerTrigger) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO circuit_breaker_triggers
                (id, reason, metric_value_pct, limit_pct, triggered_at, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(trigger.id)
        .bind(Self::reason_to_string(&trigger.reason))
        .bind(trigger.metric_value_pct)
        .bind(trigger.limit_pct)
        .bind(trigger.triggered_at)
        .bind(trigger.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reset_trigger(&self, id: uuid::Uuid, operator_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE circuit_breaker_triggers
            SET active = false, reset_by = $2, reset_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(operator_id)
        .execute(&self.pool)
        .await?;
        debug!(trigger_id = %id, operator_id, "reset circuit breaker trigger");
        Ok(())
    }

    async fn record_pause_resume(&self, event: &PauseResumeEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pause_resume_events
                (id, event_type, operator_id, previous_status, new_status, reason, note, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id)
        .bind(&event.event_type)
        .bind(&event.operator_id)
        .bind(serde_json::to_string(&event.previous_status).unwrap_or_default())
        .bind(serde_json::to_string(&event.new_status).unwrap_or_default())
        .bind(event.reason.map(|r| serde_json::to_string(&r).unwrap_or_default()))
        .bind(&event.note)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub struct PgBlockedSignalRepository {
    pool: PgPool,
}

impl PgBlockedSignalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlockedSignalRepository for PgBlockedSignalRepository {
    async fn record(&self, blocked: &BlockedSignal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO blocked_signals
                (id, signal_id, wallet, token, final_score, reason, blocked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(blocked.id)
        .bind(blocked.signal_id)
        .bind(&blocked.wallet)
        .bind(&blocked.token)
        .bind(blocked.final_score)
        .bind(PgCircuitBreakerRepository::reason_to_string(&blocked.reason))
        .bind(blocked.blocked_at)
        .execute(&self.pool)
        .await?;
        debug!(signal_id = %blocked.signal_id, "recorded blocked signal");
        Ok(())
    }
}
