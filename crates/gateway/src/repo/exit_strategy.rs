//! C10/C11 exit-strategy definitions and assignment audit trail.
//!
//! `exit_strategies.config` stores the full `ExitStrategy` (take-profit
//! ladder, trailing stop, time rules, moonbag) as a JSON string in a text
//! column, the same way `circuit_breaker_repo` serializes nested enums —
//! no `sqlx::types::Json` wrapper, since the workspace's `sqlx` feature set
//! doesn't enable it.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use trading_core::error::{Error, Result};
use trading_core::ports::repository::ExitStrategyRepository;
use trading_core::types::strategy::{ExitStrategy, ManualOverride, StrategyAssignment};

pub struct PgExitStrategyRepository {
    pool: PgPool,
}

impl PgExitStrategyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExitStrategyRepository for PgExitStrategyRepository {
    async fn find(&self, id: &str) -> Result<Option<ExitStrategy>> {
        let row = sqlx::query("SELECT config FROM exit_strategies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| {
            let config: String = r.get("config");
            serde_json::from_str(&config).map_err(Error::Json)
        })
        .transpose()
    }

    async fn default_strategy(&self) -> Result<ExitStrategy> {
        let row = sqlx::query("SELECT config FROM exit_strategies WHERE is_default = TRUE LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => {
                let config: String = r.get("config");
                serde_json::from_str(&config).map_err(Error::Json)
            }
            None => Ok(ExitStrategy::balanced_default()),
        }
    }

    async fn record_assignment(&self, assignment: &StrategyAssignment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO exit_strategy_assignments
                (position_id, exit_strategy_id, source, assigned_at, reason)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(assignment.position_id)
        .bind(&assignment.exit_strategy_id)
        .bind(serde_json::to_string(&assignment.source).unwrap_or_default())
        .bind(assignment.assigned_at)
        .bind(&assignment.reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_override(&self, override_: &ManualOverride) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO exit_strategy_overrides
                (position_id, previous_strategy_id, new_strategy_id, operator_id, reason, overridden_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(override_.position_id)
        .bind(&override_.previous_strategy_id)
        .bind(&override_.new_strategy_id)
        .bind(&override_.operator_id)
        .bind(&override_.reason)
        .bind(override_.overridden_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
