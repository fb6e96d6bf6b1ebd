//! Order-lifecycle executor (C9): drains the priority queue and drives each
//! order through PENDING -> SUBMITTED -> CONFIRMING -> FILLED/FAILED.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use trading_core::error::Result;
use trading_core::ports::alerting::{Alert, Alerting, Severity};
use trading_core::ports::assignment::ExitStrategyAssigner;
use trading_core::ports::repository::{OrderRepository, PositionRepository};
use trading_core::ports::signer::Signer;
use trading_core::ports::swap_adapter::SwapAdapter;
use trading_core::types::order::{Order, OrderKind, OrderStatus};
use trading_core::types::position::Position;

use risk_manager::CircuitBreaker;

use crate::priority_queue::OrderPriorityQueue;

/// Tuning knobs pulled from `trading_core::config::ExecutionConfig` at
/// composition time, kept here as plain fields so this crate has no direct
/// dependency on the config type.
#[derive(Debug, Clone)]
pub struct ExecutorTuning {
    pub poll_interval: Duration,
    pub confirmation_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub entry_backoff_base: Duration,
    pub exit_backoff_base: Duration,
    pub backoff_cap: Duration,
}

pub struct OrderExecutor {
    queue: Arc<OrderPriorityQueue>,
    adapter: Arc<dyn SwapAdapter>,
    signer: Arc<dyn Signer>,
    order_repo: Arc<dyn OrderRepository>,
    position_repo: Arc<dyn PositionRepository>,
    alerting: Arc<dyn Alerting>,
    circuit_breaker: Arc<CircuitBreaker>,
    assigner: Arc<dyn ExitStrategyAssigner>,
    tuning: ExecutorTuning,
    dispatcher: Mutex<Option<tokio::task::JoinHandle<()>>>,
    in_flight: Arc<Mutex<JoinSet<()>>>,
}

impl OrderExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<OrderPriorityQueue>,
        adapter: Arc<dyn SwapAdapter>,
        signer: Arc<dyn Signer>,
        order_repo: Arc<dyn OrderRepository>,
        position_repo: Arc<dyn PositionRepository>,
        alerting: Arc<dyn Alerting>,
        circuit_breaker: Arc<CircuitBreaker>,
        assigner: Arc<dyn ExitStrategyAssigner>,
        tuning: ExecutorTuning,
    ) -> Self {
        Self {
            queue,
            adapter,
            signer,
            order_repo,
            position_repo,
            alerting,
            circuit_breaker,
            assigner,
            tuning,
            dispatcher: Mutex::new(None),
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub async fn submit(&self, order: Order) -> Result<()> {
        self.order_repo.insert(&order).await?;
        info!(order_id = %order.id, kind = ?order.kind, "order submitted to queue");
        self.queue.enqueue(order).await;
        Ok(())
    }

    /// Spawn the background dispatch loop. Each dequeued order runs its own
    /// task, tracked in `in_flight` so `stop` can wait for or cancel them.
    pub async fn start(self: &Arc<Self>) {
        let mut guard = self.dispatcher.lock().await;
        if guard.is_some() {
            warn!("executor already running");
            return;
        }

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match this.queue.dequeue().await {
                    Some(order) => {
                        let this = Arc::clone(&this);
                        let mut in_flight = this.in_flight.lock().await;
                        in_flight.spawn(async move {
                            let order_id = order.id;
                            if let Err(e) = this.execute_one(order).await {
                                error!(order_id = %order_id, error = %e, "order execution failed");
                            }
                            this.queue.mark_complete(order_id).await;
                        });
                    }
                    None => tokio::time::sleep(this.tuning.poll_interval).await,
                }
            }
        });

        *guard = Some(handle);
        info!("order executor started");
    }

    /// Stop dispatching new orders and wait up to `shutdown_timeout` for
    /// in-flight order tasks to finish on their own (each persists its
    /// FILLED/FAILED state before returning). Anything still running past
    /// the deadline is cancelled.
    pub async fn stop(&self) {
        if let Some(handle) = self.dispatcher.lock().await.take() {
            handle.abort();
        }

        let mut in_flight = self.in_flight.lock().await;
        let deadline = tokio::time::Instant::now() + self.tuning.shutdown_timeout;
        while !in_flight.is_empty() {
            tokio::select! {
                joined = in_flight.join_next() => {
                    if let Some(Err(e)) = joined {
                        if !e.is_cancelled() {
                            warn!(error = %e, "in-flight order task panicked during shutdown");
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline) => break,
            }
        }

        if !in_flight.is_empty() {
            warn!(remaining = in_flight.len(), "aborting in-flight order tasks after shutdown_timeout");
            in_flight.shutdown().await;
        }
    }

    async fn execute_one(&self, mut order: Order) -> Result<()> {
        order
            .transition(OrderStatus::Submitted)
            .map_err(trading_core::error::Error::InvalidOrderTransition)?;
        self.order_repo.update(&order).await?;

        let side = order.side;
        let quote = match self
            .adapter
            .quote(&order.token, side, order.amount_sol, order.max_slippage_bps)
            .await
        {
            Ok(q) => q,
            Err(e) => return self.handle_failure(order, e.to_string()).await,
        };

        let signed_tx = match self
            .signer
            .sign(format!("{}:{}:{}", order.id, order.token, quote.expected_price).as_bytes())
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => return self.handle_failure(order, e.to_string()).await,
        };

        order
            .transition(OrderStatus::Confirming)
            .map_err(trading_core::error::Error::InvalidOrderTransition)?;
        self.order_repo.update(&order).await?;

        let submit_result = tokio::time::timeout(
            self.tuning.confirmation_timeout,
            self.adapter.submit(&order, &quote, &signed_tx),
        )
        .await;

        match submit_result {
            Ok(Ok(receipt)) => {
                order
                    .mark_filled(receipt.actual_price, receipt.tx_signature, Some(receipt.amount_tokens))
                    .map_err(trading_core::error::Error::InvalidOrderTransition)?;
                self.order_repo.update(&order).await?;
                info!(order_id = %order.id, "order filled");
                self.apply_fill_to_position(&order, receipt.amount_tokens, receipt.actual_price).await?;
                Ok(())
            }
            Ok(Err(e)) => self.handle_failure(order, e.to_string()).await,
            Err(_) => self.handle_failure(order, "confirmation timed out".to_string()).await,
        }
    }

    /// ENTRY fills open a new Position; EXIT fills reduce the existing one
    /// and close it once `current_amount_tokens` reaches zero.
    async fn apply_fill_to_position(&self, order: &Order, amount_tokens: rust_decimal::Decimal, actual_price: rust_decimal::Decimal) -> Result<()> {
        match order.kind {
            OrderKind::Entry => {
                let position = Position::open(
                    order.signal_id.expect("ENTRY orders always carry a signal_id"),
                    order.token.clone(),
                    actual_price,
                    order.amount_sol,
                    amount_tokens,
                    order.exit_strategy_id.clone().expect("ENTRY orders always carry an exit_strategy_id"),
                    order.conviction_tier.expect("ENTRY orders always carry a conviction_tier"),
                    order.is_simulated,
                );
                self.position_repo.insert(&position).await?;
                info!(position_id = %position.id, order_id = %order.id, "position opened from filled entry");

                let conviction_tier = order.conviction_tier.expect("ENTRY orders always carry a conviction_tier");
                let final_score = order.final_score.unwrap_or_default();
                if let Err(e) = self.assigner.assign(position.id, final_score, conviction_tier).await {
                    error!(error = %e, position_id = %position.id, "failed to persist exit strategy assignment");
                }
            }
            OrderKind::Exit => {
                let Some(position_id) = order.position_id else {
                    warn!(order_id = %order.id, "exit order filled with no position_id, skipping position update");
                    return Ok(());
                };
                let Some(mut position) = self.position_repo.find(position_id).await? else {
                    warn!(order_id = %order.id, position_id = %position_id, "exit filled for unknown position");
                    return Ok(());
                };
                let realized_before = position.realized_pnl_sol;
                let proceeds = amount_tokens * actual_price;
                position.apply_exit_fill(amount_tokens, proceeds);
                self.position_repo.update(&position).await?;
                info!(position_id = %position.id, closed = !position.is_open(), "position updated from filled exit");

                let pnl_delta = position.realized_pnl_sol - realized_before;
                let current_capital = self.circuit_breaker.daily_loss_metrics().await.current_capital_sol;
                if let Err(e) = self.circuit_breaker.update_capital(current_capital + pnl_delta).await {
                    error!(error = %e, position_id = %position.id, "failed to update circuit breaker capital after exit fill");
                }
            }
        }
        Ok(())
    }

    async fn handle_failure(&self, mut order: Order, error: String) -> Result<()> {
        order.mark_failed(error.clone());
        self.order_repo.update(&order).await?;

        let severity = if order.kind == OrderKind::Exit {
            Severity::Critical
        } else {
            Severity::High
        };

        if let Err(e) = self
            .alerting
            .send(Alert {
                severity,
                title: format!("{:?} order failed", order.kind),
                body: format!("order {} failed: {error}", order.id),
            })
            .await
        {
            warn!(error = %e, "failed to deliver order-failure alert");
        }

        if order.schedule_retry() {
            self.order_repo.update(&order).await?;
            let backoff = self.retry_backoff(&order);
            if !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }
            self.queue.enqueue(order).await;
        } else {
            warn!(order_id = %order.id, "order exhausted retries, left FAILED");
        }

        Ok(())
    }

    /// Exponential backoff from the kind's base, doubling per attempt and
    /// capped. EXIT orders use a shorter base since exits are urgent.
    fn retry_backoff(&self, order: &Order) -> Duration {
        let base = if order.kind == OrderKind::Exit {
            self.tuning.exit_backoff_base
        } else {
            self.tuning.entry_backoff_base
        };
        let exponent = order.attempt_count.saturating_sub(1).min(10);
        let scaled = base.saturating_mul(1u32 << exponent);
        scaled.min(self.tuning.backoff_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex as TokioMutex;
    use trading_core::ports::repository::{OrderRepository, PositionRepository};
    use trading_core::ports::swap_adapter::{Quote, SwapReceipt};
    use trading_core::types::order::OrderSide;
    use trading_core::types::position::ConvictionTier;
    use uuid::Uuid;

    fn tuning() -> ExecutorTuning {
        ExecutorTuning {
            poll_interval: Duration::from_millis(10),
            confirmation_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_millis(200),
            entry_backoff_base: Duration::from_millis(1),
            exit_backoff_base: Duration::from_millis(1),
            backoff_cap: Duration::from_millis(20),
        }
    }

    struct NoopSigner;
    #[async_trait]
    impl Signer for NoopSigner {
        async fn sign(&self, tx_bytes: &[u8]) -> Result<Vec<u8>> {
            Ok(tx_bytes.to_vec())
        }
        fn public_key(&self) -> String {
            "test-pubkey".to_string()
        }
    }

    struct FailingAdapter;
    #[async_trait]
    impl SwapAdapter for FailingAdapter {
        async fn quote(&self, _token: &str, _side: OrderSide, _amount_sol: Decimal, _max_slippage_bps: u32) -> Result<Quote> {
            Err(trading_core::error::Error::Adapter("no route".to_string()))
        }
        async fn submit(&self, _order: &Order, _quote: &Quote, _signed_tx: &[u8]) -> Result<SwapReceipt> {
            unreachable!()
        }
    }

    struct SucceedingAdapter;
    #[async_trait]
    impl SwapAdapter for SucceedingAdapter {
        async fn quote(&self, _token: &str, _side: OrderSide, _amount_sol: Decimal, _max_slippage_bps: u32) -> Result<Quote> {
            Ok(Quote { expected_price: Decimal::new(1, 2), price_impact_bps: 10, route: "direct".to_string() })
        }
        async fn submit(&self, _order: &Order, quote: &Quote, _signed_tx: &[u8]) -> Result<SwapReceipt> {
            Ok(SwapReceipt { tx_signature: "sig".to_string(), actual_price: quote.expected_price, amount_tokens: Decimal::new(5, 0) })
        }
    }

    #[derive(Default)]
    struct NoopAlerting {
        calls: AtomicUsize,
    }
    #[async_trait]
    impl Alerting for NoopAlerting {
        async fn send(&self, _alert: Alert) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
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

    fn test_circuit_breaker() -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(trading_core::config::RiskConfig {
            daily_loss_warning_pct: Decimal::new(8, 0),
            daily_loss_limit_pct: Decimal::new(10, 0),
            drawdown_limit_pct: Decimal::new(20, 0),
            starting_capital_floor_sol: Decimal::new(100, 0),
        }))
    }

    #[derive(Default)]
    struct InMemoryOrderRepo {
        orders: TokioMutex<Vec<Order>>,
    }
    #[async_trait]
    impl OrderRepository for InMemoryOrderRepo {
        async fn insert(&self, order: &Order) -> Result<()> {
            self.orders.lock().await.push(order.clone());
            Ok(())
        }
        async fn update(&self, order: &Order) -> Result<()> {
            let mut orders = self.orders.lock().await;
            if let Some(existing) = orders.iter_mut().find(|o| o.id == order.id) {
                *existing = order.clone();
            }
            Ok(())
        }
        async fn find(&self, id: Uuid) -> Result<Option<Order>> {
            Ok(self.orders.lock().await.iter().find(|o| o.id == id).cloned())
        }
    }

    #[derive(Default)]
    struct InMemoryPositionRepo {
        positions: TokioMutex<Vec<Position>>,
    }
    #[async_trait]
    impl PositionRepository for InMemoryPositionRepo {
        async fn insert(&self, position: &Position) -> Result<()> {
            self.positions.lock().await.push(position.clone());
            Ok(())
        }
        async fn update(&self, position: &Position) -> Result<()> {
            let mut positions = self.positions.lock().await;
            if let Some(existing) = positions.iter_mut().find(|p| p.id == position.id) {
                *existing = position.clone();
            }
            Ok(())
        }
        async fn find(&self, id: Uuid) -> Result<Option<Position>> {
            Ok(self.positions.lock().await.iter().find(|p| p.id == id).cloned())
        }
        async fn find_open(&self) -> Result<Vec<Position>> {
            Ok(self.positions.lock().await.iter().filter(|p| p.is_open()).cloned().collect())
        }
    }

    fn sample_entry_order() -> Order {
        Order::new_entry(
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
        )
    }

    #[tokio::test]
    async fn test_successful_entry_fill_opens_position() {
        let queue = Arc::new(OrderPriorityQueue::new(4));
        let order_repo = Arc::new(InMemoryOrderRepo::default());
        let position_repo = Arc::new(InMemoryPositionRepo::default());
        let executor = OrderExecutor::new(
            Arc::clone(&queue),
            Arc::new(SucceedingAdapter),
            Arc::new(NoopSigner),
            Arc::clone(&order_repo) as Arc<dyn OrderRepository>,
            Arc::clone(&position_repo) as Arc<dyn PositionRepository>,
            Arc::new(NoopAlerting::default()),
            test_circuit_breaker(),
            Arc::new(NoopAssigner),
            tuning(),
        );

        let order = sample_entry_order();
        let order_id = order.id;
        executor.execute_one(order).await.unwrap();

        let stored = order_repo.find(order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Filled);
        assert!(stored.actual_price.is_some());

        let positions = position_repo.positions.lock().await;
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].exit_strategy_id, "balanced");
    }

    #[tokio::test]
    async fn test_failed_quote_reschedules_retry() {
        let queue = Arc::new(OrderPriorityQueue::new(4));
        let order_repo = Arc::new(InMemoryOrderRepo::default());
        let position_repo = Arc::new(InMemoryPositionRepo::default());
        let executor = OrderExecutor::new(
            Arc::clone(&queue),
            Arc::new(FailingAdapter),
            Arc::new(NoopSigner),
            Arc::clone(&order_repo) as Arc<dyn OrderRepository>,
            position_repo as Arc<dyn PositionRepository>,
            Arc::new(NoopAlerting::default()),
            test_circuit_breaker(),
            Arc::new(NoopAssigner),
            tuning(),
        );

        let order = sample_entry_order();
        executor.execute_one(order).await.unwrap();

        assert_eq!(queue.queue_len().await, 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_leaves_order_failed() {
        let queue = Arc::new(OrderPriorityQueue::new(4));
        let order_repo = Arc::new(InMemoryOrderRepo::default());
        let position_repo = Arc::new(InMemoryPositionRepo::default());
        let executor = OrderExecutor::new(
            Arc::clone(&queue),
            Arc::new(FailingAdapter),
            Arc::new(NoopSigner),
            Arc::clone(&order_repo) as Arc<dyn OrderRepository>,
            position_repo as Arc<dyn PositionRepository>,
            Arc::new(NoopAlerting::default()),
            test_circuit_breaker(),
            Arc::new(NoopAssigner),
            tuning(),
        );

        let mut order = sample_entry_order();
        order.max_attempts = 1;
        let order_id = order.id;
        executor.execute_one(order).await.unwrap();

        let stored = order_repo.find(order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Failed);
        assert_eq!(queue.queue_len().await, 0);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let t = tuning();
        let mut order = sample_entry_order();
        let executor = OrderExecutor::new(
            Arc::new(OrderPriorityQueue::new(1)),
            Arc::new(FailingAdapter),
            Arc::new(NoopSigner),
            Arc::new(InMemoryOrderRepo::default()),
            Arc::new(InMemoryPositionRepo::default()),
            Arc::new(NoopAlerting::default()),
            test_circuit_breaker(),
            Arc::new(NoopAssigner),
            t.clone(),
        );

        order.attempt_count = 1;
        assert_eq!(executor.retry_backoff(&order), Duration::from_millis(1));
        order.attempt_count = 5;
        assert_eq!(executor.retry_backoff(&order), Duration::from_millis(16));
        order.attempt_count = 20;
        assert_eq!(executor.retry_backoff(&order), t.backoff_cap);
    }
}
