//! Cross-component integration tests: wiring independently-tested crates
//! together the way the gateway composition root does, without a database.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use order_engine::{ExecutorTuning, OrderExecutor, OrderPriorityQueue};
use position_sizer::PositionSizer;
use risk_manager::CircuitBreaker;
use rust_decimal::Decimal;
use signal_engine::{SignalFilter, SignalScorer};
use tokio::sync::Mutex as AsyncMutex;
use trading_core::config::{RiskConfig, SignalConfig, SizingConfig};
use trading_core::error::Result;
use trading_core::ports::alerting::{Alert, Alerting};
use trading_core::ports::assignment::ExitStrategyAssigner;
use trading_core::ports::price_feed::PriceFeed;
use trading_core::ports::repository::{
    ClusterRepository, ExitStrategyRepository, OrderRepository, PositionRepository,
    WalletRepository,
};
use trading_core::ports::signer::Signer;
use trading_core::ports::swap_adapter::{Quote, SwapAdapter, SwapReceipt};
use trading_core::ports::token_safety::TokenSafety;
use trading_core::types::order::{ExitReason, Order, OrderKind, OrderSide, OrderStatus};
use trading_core::types::position::{ConvictionTier, Position};
use trading_core::types::sizing::SizingOutcome;
use trading_core::types::strategy::{
    AssignmentSource, ExitStrategy, ManualOverride, ScoreStrategyRange, StrategyAssignment,
};
use trading_core::types::swap::{SwapDirection, SwapEvent};
use trading_core::types::wallet::{FilterStatus, WalletMeta};
use uuid::Uuid;
use wallet_cache::WalletCache;

fn sample_event(wallet: &str) -> SwapEvent {
    SwapEvent::new(
        "sig-1".to_string(),
        wallet.to_string(),
        "TokenMint1111111111111111111111111111111".to_string(),
        SwapDirection::Buy,
        Decimal::new(1, 0),
        Decimal::new(1000, 0),
        1,
        5000,
        chrono::Utc::now(),
    )
}

struct FixedWallet(WalletMeta);

#[async_trait]
impl WalletRepository for FixedWallet {
    async fn find_wallet(&self, wallet: &str) -> Result<Option<WalletMeta>> {
        if wallet == self.0.wallet {
            Ok(Some(self.0.clone()))
        } else {
            Ok(None)
        }
    }
}

struct NoClusters;

#[async_trait]
impl ClusterRepository for NoClusters {
    async fn cluster_weight(&self, _cluster_id: &str) -> Result<Option<Decimal>> {
        Ok(None)
    }
}

struct AllowAllSafety;

#[async_trait]
impl TokenSafety for AllowAllSafety {
    async fn is_safe(&self, _token: &str) -> Result<bool> {
        Ok(true)
    }
}

fn leader_wallet(wallet: &str, reputation: Decimal) -> WalletMeta {
    WalletMeta {
        wallet: wallet.to_string(),
        is_monitored: true,
        is_blacklisted: false,
        reputation,
        cluster_id: None,
        is_leader: true,
        cached_at: chrono::Utc::now(),
        ttl: Duration::from_secs(300),
    }
}

#[tokio::test]
async fn test_wallet_cache_filter_scorer_pipeline_trades_high_reputation_leader() {
    let wallet = "LeaderWallet1111111111111111111111111111111";
    let repo = Arc::new(FixedWallet(leader_wallet(wallet, Decimal::new(9, 1))));
    let cache = Arc::new(WalletCache::new(repo, Duration::from_secs(300), 1000));
    let filter = SignalFilter::new(cache);
    let scorer = SignalScorer::new(Arc::new(SignalConfig::default()), Arc::new(NoClusters), Arc::new(AllowAllSafety));

    let event = sample_event(wallet);
    let filter_result = filter.filter_signal(&event).await;
    assert_eq!(filter_result.status, FilterStatus::Passed);

    let scored = scorer.score_and_check(event, filter_result).await;
    assert!(scored.should_trade, "{}", scored.explanation);
    assert!(scored.is_leader);
}

#[tokio::test]
async fn test_filter_blocks_blacklisted_wallet_before_it_ever_reaches_the_scorer() {
    let wallet = "BlacklistedWallet111111111111111111111111111";
    let mut meta = leader_wallet(wallet, Decimal::new(9, 1));
    meta.is_blacklisted = true;
    let repo = Arc::new(FixedWallet(meta));
    let cache = Arc::new(WalletCache::new(repo, Duration::from_secs(300), 1000));
    let filter = SignalFilter::new(cache);

    let filter_result = filter.filter_signal(&sample_event(wallet)).await;
    assert_eq!(filter_result.status, FilterStatus::BlockedBlacklisted);
}

#[tokio::test]
async fn test_scored_signal_flows_into_an_approved_sizing_decision() {
    let wallet = "LeaderWallet2222222222222222222222222222222";
    let repo = Arc::new(FixedWallet(leader_wallet(wallet, Decimal::new(9, 1))));
    let cache = Arc::new(WalletCache::new(repo, Duration::from_secs(300), 1000));
    let filter = SignalFilter::new(cache);
    let scorer = SignalScorer::new(Arc::new(SignalConfig::default()), Arc::new(NoClusters), Arc::new(AllowAllSafety));

    let event = sample_event(wallet);
    let filter_result = filter.filter_signal(&event).await;
    let scored = scorer.score_and_check(event, filter_result).await;

    let circuit_breaker = Arc::new(CircuitBreaker::new(RiskConfig::default()));
    circuit_breaker.seed_capital(Some(Decimal::new(100, 0)), Decimal::ZERO).await;
    let sizer = PositionSizer::new(Arc::new(SizingConfig::default()), circuit_breaker);

    let decision = sizer.size(&scored, Decimal::new(100, 0), 0, Decimal::ZERO);
    assert!(decision.is_sizeable());
    assert!(decision.final_amount_sol > Decimal::ZERO);
}

#[tokio::test]
async fn test_tripped_circuit_breaker_rejects_sizing_regardless_of_signal_quality() {
    let wallet = "LeaderWallet3333333333333333333333333333333";
    let repo = Arc::new(FixedWallet(leader_wallet(wallet, Decimal::ONE)));
    let cache = Arc::new(WalletCache::new(repo, Duration::from_secs(300), 1000));
    let filter = SignalFilter::new(cache);
    let scorer = SignalScorer::new(Arc::new(SignalConfig::default()), Arc::new(NoClusters), Arc::new(AllowAllSafety));

    let event = sample_event(wallet);
    let filter_result = filter.filter_signal(&event).await;
    let scored = scorer.score_and_check(event, filter_result).await;
    assert!(scored.should_trade);

    let circuit_breaker = Arc::new(CircuitBreaker::new(RiskConfig::default()));
    circuit_breaker.seed_capital(Some(Decimal::new(100, 0)), Decimal::ZERO).await;
    // 15% drawdown from 100 -> 85 trips the 10% daily-loss limit.
    circuit_breaker.update_capital(Decimal::new(85, 0)).await.unwrap();
    assert!(!circuit_breaker.entry_allowed());

    let sizer = PositionSizer::new(Arc::new(SizingConfig::default()), circuit_breaker);
    let decision = sizer.size(&scored, Decimal::new(85, 0), 0, Decimal::ZERO);
    assert_eq!(decision.outcome, SizingOutcome::RejectedTradingPaused);
}

#[tokio::test]
async fn test_priority_queue_always_drains_exits_before_entries() {
    let queue = OrderPriorityQueue::new(4);
    let entry = Order::new_entry(
        Uuid::new_v4(),
        "token".to_string(),
        Decimal::new(1, 0),
        Decimal::new(1, 2),
        100,
        3,
        "balanced".to_string(),
        ConvictionTier::Standard,
        Decimal::new(8, 1),
        true,
    );
    let exit = Order::new_exit(
        Uuid::new_v4(),
        "token".to_string(),
        Decimal::new(10, 0),
        Decimal::new(1, 2),
        100,
        ExitReason::StopLoss,
        3,
        true,
    );

    // Enqueue entry first; the exit should still dequeue first.
    queue.enqueue(entry).await;
    queue.enqueue(exit).await;

    let first = queue.dequeue().await.unwrap();
    assert_eq!(first.kind, OrderKind::Exit);
}

struct InMemoryOrderRepo {
    orders: AsyncMutex<std::collections::HashMap<Uuid, Order>>,
}

impl InMemoryOrderRepo {
    fn new() -> Self {
        Self { orders: AsyncMutex::new(std::collections::HashMap::new()) }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepo {
    async fn insert(&self, order: &Order) -> Result<()> {
        self.orders.lock().await.insert(order.id, order.clone());
        Ok(())
    }
    async fn update(&self, order: &Order) -> Result<()> {
        self.orders.lock().await.insert(order.id, order.clone());
        Ok(())
    }
    async fn find(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.orders.lock().await.get(&id).cloned())
    }
}

struct SinglePositionRepo(AsyncMutex<Option<Position>>);

impl SinglePositionRepo {
    fn empty() -> Self {
        Self(AsyncMutex::new(None))
    }
}

#[async_trait]
impl PositionRepository for SinglePositionRepo {
    async fn insert(&self, position: &Position) -> Result<()> {
        *self.0.lock().await = Some(position.clone());
        Ok(())
    }
    async fn update(&self, position: &Position) -> Result<()> {
        *self.0.lock().await = Some(position.clone());
        Ok(())
    }
    async fn find(&self, _id: Uuid) -> Result<Option<Position>> {
        Ok(self.0.lock().await.clone())
    }
    async fn find_open(&self) -> Result<Vec<Position>> {
        Ok(self.0.lock().await.iter().filter(|p| p.is_open()).cloned().collect())
    }
}

struct NoopSigner;

#[async_trait]
impl Signer for NoopSigner {
    async fn sign(&self, tx_bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(tx_bytes.to_vec())
    }
    fn public_key(&self) -> String {
        "noop".to_string()
    }
}

struct NoopAlerting;

#[async_trait]
impl Alerting for NoopAlerting {
    async fn send(&self, _alert: Alert) -> Result<()> {
        Ok(())
    }
}

struct NoopAssigner;

#[async_trait]
impl ExitStrategyAssigner for NoopAssigner {
    async fn assign(&self, _position_id: Uuid, _signal_score: Decimal, _conviction_tier: ConvictionTier) -> Result<()> {
        Ok(())
    }
}

struct FillingAdapter {
    price: Decimal,
}

#[async_trait]
impl SwapAdapter for FillingAdapter {
    async fn quote(&self, _token: &str, _side: OrderSide, _amount_sol: Decimal, _max_slippage_bps: u32) -> Result<Quote> {
        Ok(Quote { expected_price: self.price, price_impact_bps: 0, route: "test".to_string() })
    }
    async fn submit(&self, order: &Order, quote: &Quote, _signed_tx: &[u8]) -> Result<SwapReceipt> {
        let amount_tokens = order.amount_sol / quote.expected_price;
        Ok(SwapReceipt {
            tx_signature: format!("fill-{}", order.id),
            actual_price: quote.expected_price,
            amount_tokens,
        })
    }
}

struct FixedPriceFeed(Decimal);

#[async_trait]
impl PriceFeed for FixedPriceFeed {
    async fn current_price_sol(&self, _token: &str) -> Result<Decimal> {
        Ok(self.0)
    }
}

struct SingleStrategyRepo(ExitStrategy);

#[async_trait]
impl ExitStrategyRepository for SingleStrategyRepo {
    async fn find(&self, _id: &str) -> Result<Option<ExitStrategy>> {
        Ok(Some(self.0.clone()))
    }
    async fn default_strategy(&self) -> Result<ExitStrategy> {
        Ok(self.0.clone())
    }
    async fn record_assignment(&self, _assignment: &StrategyAssignment) -> Result<()> {
        Ok(())
    }
    async fn record_override(&self, _override_: &ManualOverride) -> Result<()> {
        Ok(())
    }
}

/// Submits an ENTRY order through the full executor, confirms the fill opens
/// a position, then hands that same position to the exit monitor and checks
/// a stop-loss exit gets raised once price drops below the strategy's floor.
#[tokio::test]
async fn test_entry_fill_opens_a_position_the_exit_monitor_then_protects() {
    let queue = Arc::new(OrderPriorityQueue::new(4));
    let position_repo = Arc::new(SinglePositionRepo::empty());
    let circuit_breaker = Arc::new(CircuitBreaker::new(RiskConfig::default()));
    circuit_breaker.seed_capital(Some(Decimal::new(100, 0)), Decimal::ZERO).await;
    let executor = Arc::new(OrderExecutor::new(
        queue.clone(),
        Arc::new(FillingAdapter { price: Decimal::new(1, 0) }),
        Arc::new(NoopSigner),
        Arc::new(InMemoryOrderRepo::new()),
        position_repo.clone(),
        Arc::new(NoopAlerting),
        circuit_breaker,
        Arc::new(NoopAssigner),
        ExecutorTuning {
            poll_interval: Duration::from_millis(5),
            confirmation_timeout: Duration::from_millis(200),
            shutdown_timeout: Duration::from_millis(200),
            entry_backoff_base: Duration::from_millis(10),
            exit_backoff_base: Duration::from_millis(10),
            backoff_cap: Duration::from_millis(100),
        },
    ));
    executor.start().await;

    let entry = Order::new_entry(
        Uuid::new_v4(),
        "token".to_string(),
        Decimal::new(1, 0),
        Decimal::new(1, 0),
        100,
        3,
        "balanced".to_string(),
        ConvictionTier::Standard,
        Decimal::new(8, 1),
        true,
    );
    executor.submit(entry).await.unwrap();

    let mut position = None;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if let Some(p) = position_repo.find(Uuid::nil()).await.unwrap() {
            position = Some(p);
            break;
        }
    }
    let position = position.expect("entry order should have filled and opened a position");
    assert_eq!(position.status, trading_core::types::position::PositionStatus::Open);
    executor.stop().await;

    let strategy = ExitStrategy::balanced_default();
    // 25% stop-loss fraction off an entry price of 1.0 -> triggers at 0.75.
    let exit_monitor = exit_monitor::ExitMonitor::new(
        position_repo,
        Arc::new(SingleStrategyRepo(strategy)),
        Arc::new(FixedPriceFeed(Decimal::new(70, 2))),
        queue.clone(),
        Duration::from_millis(10),
        100,
        3,
    );
    exit_monitor.tick().await.unwrap();

    let queued = queue.dequeue().await.expect("stop-loss exit should have been queued");
    assert_eq!(queued.exit_reason, Some(ExitReason::StopLoss));
    assert_eq!(queued.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_strategy_assigner_maps_high_score_to_aggressive_and_falls_back_otherwise() {
    let mapping = trading_core::config::StrategyMappingConfig {
        enabled: true,
        mappings: vec![ScoreStrategyRange {
            min_score: Decimal::new(85, 2),
            max_score: Decimal::ONE,
            strategy_id: "aggressive".to_string(),
        }],
        default_standard_strategy_id: "balanced".to_string(),
        default_high_strategy_id: "aggressive".to_string(),
    };
    let assigner = exit_monitor::StrategyAssigner::new(
        Arc::new(SingleStrategyRepo(ExitStrategy::balanced_default())),
        mapping,
    );

    let (strategy_id, source, _) = assigner.preview(Decimal::new(9, 1), ConvictionTier::High);
    assert_eq!(strategy_id, "aggressive");
    assert_eq!(source, AssignmentSource::ConvictionRule);

    let (strategy_id, source, _) = assigner.preview(Decimal::new(5, 1), ConvictionTier::Standard);
    assert_eq!(strategy_id, "balanced");
    assert_eq!(source, AssignmentSource::Default);
}
