//! Per-concern configuration for the signal and execution control plane.
//!
//! Loaded once at startup via [`AppConfig::from_env`]; individual concerns
//! are then wrapped in `Arc<RwLock<_>>` cells by the owning crate so that
//! operators can hot-reload thresholds without a restart.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;

use crate::error::Result;
use crate::types::strategy::ScoreStrategyRange;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// C1 wallet cache.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            max_entries: 50_000,
        }
    }
}

/// C2-C5 filter, scorer, threshold gate, signal log.
#[derive(Debug, Clone, Deserialize)]
pub struct SignalConfig {
    pub min_score_threshold: Decimal,
    pub leader_score_boost: Decimal,
    pub cluster_score_boost: Decimal,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            min_score_threshold: Decimal::new(65, 2),
            leader_score_boost: Decimal::new(15, 2),
            cluster_score_boost: Decimal::new(1, 1),
        }
    }
}

/// C6/C12 daily-loss and drawdown gate.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    pub daily_loss_warning_pct: Decimal,
    pub daily_loss_limit_pct: Decimal,
    pub drawdown_limit_pct: Decimal,
    /// Last-resort floor used when no capital snapshot exists yet.
    pub starting_capital_floor_sol: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            daily_loss_warning_pct: Decimal::new(8, 0),
            daily_loss_limit_pct: Decimal::new(10, 0),
            drawdown_limit_pct: Decimal::new(20, 0),
            starting_capital_floor_sol: Decimal::new(10, 0),
        }
    }
}

/// C7 position sizer.
#[derive(Debug, Clone, Deserialize)]
pub struct SizingConfig {
    /// Base position size as a fraction of available budget (e.g. `0.1` = 10%).
    pub base_position_pct: Decimal,
    pub max_position_sol: Decimal,
    pub min_position_sol: Decimal,
    pub max_exposure_pct: Decimal,
    pub high_conviction_multiplier: Decimal,
    pub high_conviction_threshold: Decimal,
    pub max_concurrent_positions: usize,
    /// Capital held back from sizing calculations entirely (gas buffer).
    pub reserve_sol: Decimal,
    /// When a calculated size falls below `min_position_sol`: if `true`,
    /// round up to the floor instead of skipping the trade.
    pub reduce_below_min: bool,
    /// Signals scoring below this are skipped before sizing runs at all,
    /// independent of the threshold gate's own `should_trade` verdict.
    pub min_conviction_threshold: Decimal,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            base_position_pct: Decimal::new(1, 1),
            max_position_sol: Decimal::new(5, 0),
            min_position_sol: Decimal::new(1, 1),
            max_exposure_pct: Decimal::new(50, 0),
            high_conviction_multiplier: Decimal::new(15, 1),
            high_conviction_threshold: Decimal::new(85, 2),
            max_concurrent_positions: 10,
            reserve_sol: Decimal::new(5, 1),
            reduce_below_min: false,
            min_conviction_threshold: Decimal::new(5, 1),
        }
    }
}

/// C8/C9 priority queue and executor.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    pub max_concurrent_orders: usize,
    pub default_max_attempts: u32,
    pub default_max_slippage_bps: u32,
    /// Base backoff for ENTRY retries; doubles per attempt up to `backoff_cap_ms`.
    pub retry_backoff_ms: u64,
    /// Base backoff for EXIT retries, shorter than ENTRY since exits are urgent.
    pub exit_retry_backoff_ms: u64,
    pub backoff_cap_ms: u64,
    /// Bound on quote/submit + confirmation polling for a single attempt.
    pub confirmation_timeout_ms: u64,
    /// How long `stop()` waits for in-flight order tasks before cancelling them.
    pub shutdown_timeout_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_orders: 8,
            default_max_attempts: 3,
            default_max_slippage_bps: 150,
            retry_backoff_ms: 500,
            exit_retry_backoff_ms: 150,
            backoff_cap_ms: 10_000,
            confirmation_timeout_ms: 30_000,
            shutdown_timeout_ms: 5_000,
        }
    }
}

/// C10/C11 exit monitor and strategy assigner.
#[derive(Debug, Clone, Deserialize)]
pub struct ExitConfig {
    pub poll_interval_ms: u64,
    pub mapping: StrategyMappingConfig,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            mapping: StrategyMappingConfig::default(),
        }
    }
}

/// Score-to-strategy mapping table used by the strategy assigner (C11) when
/// a new position has no manual override. The first range containing the
/// signal score wins; no match falls back to the per-conviction-tier
/// default.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyMappingConfig {
    pub enabled: bool,
    pub mappings: Vec<ScoreStrategyRange>,
    pub default_standard_strategy_id: String,
    pub default_high_strategy_id: String,
}

impl Default for StrategyMappingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mappings: vec![ScoreStrategyRange {
                min_score: Decimal::new(85, 2),
                max_score: Decimal::ONE,
                strategy_id: "aggressive".to_string(),
            }],
            default_standard_strategy_id: "balanced".to_string(),
            default_high_strategy_id: "aggressive".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub hmac_secret: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AlertsConfig {
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub discord_webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub signal: SignalConfig,
    pub risk: RiskConfig,
    pub sizing: SizingConfig,
    pub execution: ExecutionConfig,
    pub exit: ExitConfig,
    pub webhook: WebhookConfig,
    pub alerts: AlertsConfig,
}

/// Reads `key` and parses it, falling back to `default` when unset or
/// unparseable. Mirrors the teacher's `Config::from_env` pattern of never
/// failing startup over a malformed optional field.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

impl AppConfig {
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let sizing_default = SizingConfig::default();
        let risk_default = RiskConfig::default();
        let cache_default = CacheConfig::default();
        let signal_default = SignalConfig::default();
        let execution_default = ExecutionConfig::default();
        let exit_default = ExitConfig::default();

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgres://localhost/smart_money".to_string()),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5),
            },
            cache: CacheConfig {
                ttl_seconds: env_or("CACHE_TTL_SECONDS", cache_default.ttl_seconds),
                max_entries: env_or("CACHE_MAX_ENTRIES", cache_default.max_entries),
            },
            signal: SignalConfig {
                min_score_threshold: env_or("MIN_SCORE_THRESHOLD", signal_default.min_score_threshold),
                leader_score_boost: env_or("LEADER_SCORE_BOOST", signal_default.leader_score_boost),
                cluster_score_boost: env_or("CLUSTER_SCORE_BOOST", signal_default.cluster_score_boost),
            },
            risk: RiskConfig {
                daily_loss_warning_pct: env_or("DAILY_LOSS_WARNING_PCT", risk_default.daily_loss_warning_pct),
                daily_loss_limit_pct: env_or("DAILY_LOSS_LIMIT_PCT", risk_default.daily_loss_limit_pct),
                drawdown_limit_pct: env_or("DRAWDOWN_LIMIT_PCT", risk_default.drawdown_limit_pct),
                starting_capital_floor_sol: env_or(
                    "STARTING_CAPITAL_FLOOR_SOL",
                    risk_default.starting_capital_floor_sol,
                ),
            },
            sizing: SizingConfig {
                base_position_pct: env_or("BASE_POSITION_PCT", sizing_default.base_position_pct),
                max_position_sol: env_or("MAX_POSITION_SOL", sizing_default.max_position_sol),
                min_position_sol: env_or("MIN_POSITION_SOL", sizing_default.min_position_sol),
                max_exposure_pct: env_or("MAX_EXPOSURE_PCT", sizing_default.max_exposure_pct),
                high_conviction_multiplier: env_or(
                    "HIGH_CONVICTION_MULTIPLIER",
                    sizing_default.high_conviction_multiplier,
                ),
                high_conviction_threshold: env_or(
                    "HIGH_CONVICTION_THRESHOLD",
                    sizing_default.high_conviction_threshold,
                ),
                max_concurrent_positions: env_or(
                    "MAX_CONCURRENT_POSITIONS",
                    sizing_default.max_concurrent_positions,
                ),
                reserve_sol: env_or("RESERVE_SOL", sizing_default.reserve_sol),
                reduce_below_min: env_or("REDUCE_BELOW_MIN", sizing_default.reduce_below_min),
                min_conviction_threshold: env_or(
                    "MIN_CONVICTION_THRESHOLD",
                    sizing_default.min_conviction_threshold,
                ),
            },
            execution: ExecutionConfig {
                max_concurrent_orders: env_or("MAX_CONCURRENT_ORDERS", execution_default.max_concurrent_orders),
                default_max_attempts: env_or("DEFAULT_MAX_ATTEMPTS", execution_default.default_max_attempts),
                default_max_slippage_bps: env_or(
                    "DEFAULT_MAX_SLIPPAGE_BPS",
                    execution_default.default_max_slippage_bps,
                ),
                retry_backoff_ms: env_or("RETRY_BACKOFF_MS", execution_default.retry_backoff_ms),
                exit_retry_backoff_ms: env_or("EXIT_RETRY_BACKOFF_MS", execution_default.exit_retry_backoff_ms),
                backoff_cap_ms: env_or("BACKOFF_CAP_MS", execution_default.backoff_cap_ms),
                confirmation_timeout_ms: env_or(
                    "CONFIRMATION_TIMEOUT_MS",
                    execution_default.confirmation_timeout_ms,
                ),
                shutdown_timeout_ms: env_or("SHUTDOWN_TIMEOUT_MS", execution_default.shutdown_timeout_ms),
            },
            exit: ExitConfig {
                poll_interval_ms: env_or("EXIT_POLL_INTERVAL_MS", exit_default.poll_interval_ms),
                // The mapping table is a list of structs; there's no sane
                // scalar env-var encoding for it, so it's only ever set from
                // defaults or a future config-CRUD surface, never from env.
                mapping: exit_default.mapping,
            },
            webhook: WebhookConfig {
                hmac_secret: env::var("WEBHOOK_HMAC_SECRET").unwrap_or_default(),
            },
            alerts: AlertsConfig {
                telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
                telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
                discord_webhook_url: env::var("DISCORD_WEBHOOK_URL").ok(),
            },
        })
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgres://localhost/smart_money_test".to_string(),
                max_connections: 2,
            },
            cache: CacheConfig::default(),
            signal: SignalConfig::default(),
            risk: RiskConfig::default(),
            sizing: SizingConfig::default(),
            execution: ExecutionConfig::default(),
            exit: ExitConfig::default(),
            webhook: WebhookConfig {
                hmac_secret: "test-secret".to_string(),
            },
            alerts: AlertsConfig::default(),
        }
    }
}
