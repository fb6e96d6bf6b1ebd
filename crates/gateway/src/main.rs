//! Gateway binary entrypoint: webhook HTTP adapter and composition root.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::{Parser, Subcommand};
use gateway::error::{GatewayError, GatewayResult};
use gateway::repo::{
    PgClusterRepository, PgExitStrategyRepository, PgOrderRepository, PgPositionRepository,
    PgSignalLogRepository, PgWalletRepository,
};
use gateway::sim_adapters::{
    allow_all_token_safety, logging_alerting, simulated_price_feed, simulated_signer,
    simulated_swap_adapter,
};
use gateway::webhook::{self, HeliusSwapPayload};
use order_engine::{ExecutorTuning, OrderExecutor, OrderPriorityQueue};
use position_sizer::PositionSizer;
use risk_manager::{
    CircuitBreaker, PgBlockedSignalRepository, PgCapitalRepository, PgCircuitBreakerRepository,
    SystemStateManager,
};
use rust_decimal::Decimal;
use serde::Serialize;
use signal_engine::{SignalFilter, SignalLog, SignalScorer};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trading_core::config::AppConfig;
use trading_core::ports::{BlockedSignalRepository, CapitalRepository, PositionRepository};
use trading_core::types::position::ConvictionTier;
use trading_core::types::risk::{BlockedSignal, PauseReason, SystemStatus, TriggerReason};
use wallet_cache::WalletCache;

#[derive(Parser)]
#[command(name = "gateway")]
#[command(about = "Webhook gateway and control plane for the smart-money signal pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway HTTP server (default)
    Serve,
}

struct AppState {
    cache: Arc<WalletCache>,
    filter: SignalFilter,
    scorer: SignalScorer,
    signal_log: Arc<SignalLog>,
    circuit_breaker: Arc<CircuitBreaker>,
    system: Arc<SystemStateManager>,
    sizer: PositionSizer,
    assigner: Arc<exit_monitor::StrategyAssigner>,
    queue: Arc<OrderPriorityQueue>,
    executor: Arc<OrderExecutor>,
    position_repo: Arc<dyn trading_core::ports::PositionRepository>,
    blocked_signal_repo: Arc<dyn BlockedSignalRepository>,
    config: Arc<AppConfig>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "gateway=info,tower_http=warn,sqlx=warn".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Serve) | None => run_server().await?,
    }

    Ok(())
}

async fn run_server() -> anyhow::Result<()> {
    let config = Arc::new(AppConfig::from_env()?);

    info!("connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;

    let wallet_repo = Arc::new(PgWalletRepository::new(pool.clone()));
    let cluster_repo = Arc::new(PgClusterRepository::new(pool.clone()));
    let order_repo: Arc<dyn trading_core::ports::OrderRepository> =
        Arc::new(PgOrderRepository::new(pool.clone()));
    let position_repo: Arc<dyn trading_core::ports::PositionRepository> =
        Arc::new(PgPositionRepository::new(pool.clone()));
    let signal_log_repo = Arc::new(PgSignalLogRepository::new(pool.clone()));
    let exit_strategy_repo: Arc<dyn trading_core::ports::ExitStrategyRepository> =
        Arc::new(PgExitStrategyRepository::new(pool.clone()));
    let capital_repo = Arc::new(PgCapitalRepository::new(pool.clone()));
    let circuit_breaker_repo: Arc<dyn trading_core::ports::CircuitBreakerRepository> =
        Arc::new(PgCircuitBreakerRepository::new(pool.clone()));
    let blocked_signal_repo: Arc<dyn BlockedSignalRepository> =
        Arc::new(PgBlockedSignalRepository::new(pool.clone()));

    let cache = Arc::new(WalletCache::new(
        wallet_repo,
        Duration::from_secs(config.cache.ttl_seconds),
        config.cache.max_entries,
    ));
    let filter = SignalFilter::new(cache.clone());
    let scorer = SignalScorer::new(
        Arc::new(config.signal.clone()),
        cluster_repo,
        allow_all_token_safety(),
    );

    let signal_log = SignalLog::new(signal_log_repo, 10_000, 100, Duration::from_millis(500));
    signal_log.start().await;

    let circuit_breaker = Arc::new(
        CircuitBreaker::with_repository(config.risk.clone(), circuit_breaker_repo.clone())
            .with_alerting(logging_alerting()),
    );
    let last_known = capital_repo.latest_snapshot().await?.map(|s| s.total_capital_sol);
    let open_positions_entry_sol_sum: Decimal = position_repo
        .find_open()
        .await?
        .iter()
        .map(|p| p.entry_amount_sol)
        .sum();
    circuit_breaker.seed_capital(last_known, open_positions_entry_sol_sum).await;

    let system = Arc::new(
        SystemStateManager::with_repository(circuit_breaker_repo)
            .with_circuit_breaker(circuit_breaker.clone()),
    );

    let sizer = PositionSizer::new(Arc::new(config.sizing.clone()), circuit_breaker.clone());
    let assigner = Arc::new(exit_monitor::StrategyAssigner::new(
        exit_strategy_repo.clone(),
        config.exit.mapping.clone(),
    ));

    let queue = Arc::new(OrderPriorityQueue::new(config.execution.max_concurrent_orders));

    let executor = Arc::new(OrderExecutor::new(
        queue.clone(),
        simulated_swap_adapter(),
        simulated_signer("simulated-gateway-key"),
        order_repo,
        position_repo.clone(),
        logging_alerting(),
        circuit_breaker.clone(),
        assigner.clone(),
        ExecutorTuning {
            poll_interval: Duration::from_millis(50),
            confirmation_timeout: Duration::from_millis(config.execution.confirmation_timeout_ms),
            shutdown_timeout: Duration::from_millis(config.execution.shutdown_timeout_ms),
            entry_backoff_base: Duration::from_millis(config.execution.retry_backoff_ms),
            exit_backoff_base: Duration::from_millis(config.execution.exit_retry_backoff_ms),
            backoff_cap: Duration::from_millis(config.execution.backoff_cap_ms),
        },
    ));
    executor.start().await;

    let exit_monitor_handle = Arc::new(exit_monitor::ExitMonitor::new(
        position_repo.clone(),
        exit_strategy_repo,
        simulated_price_feed(Decimal::ZERO),
        queue.clone(),
        Duration::from_millis(config.exit.poll_interval_ms),
        config.execution.default_max_slippage_bps,
        config.execution.default_max_attempts,
    ));
    exit_monitor_handle.start().await;

    let state = Arc::new(AppState {
        cache,
        filter,
        scorer,
        signal_log,
        circuit_breaker,
        system,
        sizer,
        assigner,
        queue,
        executor,
        position_repo,
        blocked_signal_repo,
        config: config.clone(),
    });

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/webhooks/helius", post(handle_webhook))
        .route("/system/pause", post(handle_pause))
        .route("/system/resume", post(handle_resume))
        .route("/queue/stats", get(queue_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = "0.0.0.0:8080".parse()?;
    info!(%addr, "gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy", version: env!("CARGO_PKG_VERSION") })
}

async fn queue_stats(State(state): State<Arc<AppState>>) -> Json<order_engine::QueueStats> {
    Json(state.queue.stats().await)
}

#[derive(serde::Deserialize)]
struct PauseRequest {
    operator_id: Option<String>,
    note: Option<String>,
}

async fn handle_pause(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PauseRequest>,
) -> GatewayResult<StatusCode> {
    state
        .system
        .pause(SystemStatus::PausedManual, PauseReason::Operator, req.operator_id, req.note)
        .await?;
    Ok(StatusCode::OK)
}

#[derive(serde::Deserialize)]
struct ResumeRequest {
    operator_id: String,
    acknowledge_warning: bool,
    note: Option<String>,
}

async fn handle_resume(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResumeRequest>,
) -> GatewayResult<StatusCode> {
    state
        .system
        .resume(req.operator_id, req.acknowledge_warning, req.note)
        .await?;
    Ok(StatusCode::OK)
}

/// Verify, parse, and run a single Helius webhook delivery through the full
/// signal pipeline: filter -> score -> log -> (if tradeable) size -> assign
/// strategy -> submit an ENTRY order.
async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> GatewayResult<StatusCode> {
    let signature = headers
        .get("x-helius-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(GatewayError::SignatureInvalid)?;
    webhook::verify_signature(&state.config.webhook.hmac_secret, &body, signature)?;

    let payload: HeliusSwapPayload = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;

    let Some(event) = webhook::parse_swap_event(&payload)? else {
        return Ok(StatusCode::ACCEPTED);
    };

    let filter_result = state.filter.filter_signal(&event).await;
    if filter_result.status != trading_core::types::wallet::FilterStatus::Passed {
        state
            .signal_log
            .log(uuid::Uuid::new_v4(), "filtered", serde_json::json!({"status": format!("{:?}", filter_result.status)}))
            .await;
        return Ok(StatusCode::ACCEPTED);
    }

    let signal_id = uuid::Uuid::new_v4();
    let scored = state.scorer.score_and_check(event, filter_result).await;
    state
        .signal_log
        .log(signal_id, "scored", serde_json::json!({"final_score": scored.final_score, "should_trade": scored.should_trade}))
        .await;

    if !scored.should_trade {
        return Ok(StatusCode::ACCEPTED);
    }

    let open_positions = state.position_repo.find_open().await?;
    let current_allocated: Decimal = open_positions.iter().map(|p| p.entry_amount_sol).sum();
    let available_balance = state.circuit_breaker.daily_loss_metrics().await.current_capital_sol - current_allocated;

    let decision = state.sizer.size(&scored, available_balance, open_positions.len(), current_allocated);
    state
        .signal_log
        .log(signal_id, "sized", serde_json::to_value(&decision).unwrap_or_default())
        .await;

    if !decision.is_sizeable() {
        if decision.outcome == trading_core::types::sizing::SizingOutcome::RejectedTradingPaused {
            let reason = state.circuit_breaker.last_trip_reason().await.unwrap_or(TriggerReason::ManualHalt);
            let blocked = BlockedSignal {
                id: uuid::Uuid::new_v4(),
                signal_id,
                wallet: scored.event.wallet.clone(),
                token: scored.event.token.clone(),
                final_score: scored.final_score,
                reason,
                blocked_at: chrono::Utc::now(),
            };
            if let Err(e) = state.blocked_signal_repo.record(&blocked).await {
                warn!(error = %e, "failed to persist blocked signal");
            }
        }
        return Ok(StatusCode::ACCEPTED);
    }

    let conviction_tier = if scored.final_score >= state.config.sizing.high_conviction_threshold {
        ConvictionTier::High
    } else {
        ConvictionTier::Standard
    };
    // No position exists yet to assign against; preview picks the strategy id the
    // order carries, and `assign` persists the real assignment once the ENTRY fills
    // and the executor opens the position (see `apply_fill_to_position`).
    let (strategy_id, _source, _reason) = state.assigner.preview(scored.final_score, conviction_tier);

    let expected_price = if scored.event.amount_token.is_zero() {
        Decimal::ZERO
    } else {
        scored.event.amount_sol / scored.event.amount_token
    };
    let order = trading_core::types::order::Order::new_entry(
        signal_id,
        scored.event.token.clone(),
        decision.final_amount_sol,
        expected_price,
        state.config.execution.default_max_slippage_bps,
        state.config.execution.default_max_attempts,
        strategy_id,
        conviction_tier,
        scored.final_score,
        true,
    );

    if let Err(e) = state.executor.submit(order).await {
        warn!(error = %e, "failed to submit entry order");
    }

    Ok(StatusCode::ACCEPTED)
}
