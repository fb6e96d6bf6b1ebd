//! Exit-strategy evaluation (C10): on every tick, walk every open position,
//! fetch its current price, and check the configured exit rules in
//! priority order: stop-loss, trailing stop, take-profit ladder, max-hold,
//! stagnation. At most one rule fires per position per tick; the resulting
//! EXIT order is handed straight to the order-engine priority queue.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use order_engine::priority_queue::OrderPriorityQueue;
use trading_core::error::Result;
use trading_core::ports::price_feed::PriceFeed;
use trading_core::ports::repository::{ExitStrategyRepository, PositionRepository};
use trading_core::types::order::{ExitReason, Order};
use trading_core::types::position::Position;
use trading_core::types::strategy::ExitStrategy;

use crate::runtime_state::ExitRuntimeState;

/// One rule's verdict: how many tokens (of the original entry amount) to
/// sell, and why.
struct ExitDecision {
    tokens_to_sell: Decimal,
    reason: ExitReason,
    tp_level_index: Option<usize>,
}

pub struct ExitMonitor {
    positions: Arc<dyn PositionRepository>,
    strategies: Arc<dyn ExitStrategyRepository>,
    price_feed: Arc<dyn PriceFeed>,
    queue: Arc<OrderPriorityQueue>,
    runtime_state: DashMap<Uuid, ExitRuntimeState>,
    tick_interval: Duration,
    max_slippage_bps: u32,
    max_attempts: u32,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ExitMonitor {
    pub fn new(
        positions: Arc<dyn PositionRepository>,
        strategies: Arc<dyn ExitStrategyRepository>,
        price_feed: Arc<dyn PriceFeed>,
        queue: Arc<OrderPriorityQueue>,
        tick_interval: Duration,
        max_slippage_bps: u32,
        max_attempts: u32,
    ) -> Self {
        Self {
            positions,
            strategies,
            price_feed,
            queue,
            runtime_state: DashMap::new(),
            tick_interval,
            max_slippage_bps,
            max_attempts,
            task: Mutex::new(None),
        }
    }

    pub async fn start(self: &Arc<Self>) {
        let mut guard = self.task.lock().await;
        if guard.is_some() {
            warn!("exit monitor already running");
            return;
        }

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                if let Err(e) = this.tick().await {
                    warn!(error = %e, "exit monitor tick failed");
                }
                tokio::time::sleep(this.tick_interval).await;
            }
        });

        *guard = Some(handle);
        info!("exit monitor started");
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
        }
    }

    pub async fn tick(&self) -> Result<()> {
        let open_positions = self.positions.find_open().await?;
        for position in open_positions {
            if let Err(e) = self.evaluate(&position).await {
                warn!(position_id = %position.id, error = %e, "failed to evaluate position for exit");
            }
        }
        Ok(())
    }

    async fn evaluate(&self, position: &Position) -> Result<()> {
        let strategy = match self.strategies.find(&position.exit_strategy_id).await? {
            Some(s) => s,
            None => self.strategies.default_strategy().await?,
        };
        let current_price = self.price_feed.current_price_sol(&position.token).await?;
        let now = Utc::now();

        let mut state_ref = self
            .runtime_state
            .entry(position.id)
            .or_insert_with(|| ExitRuntimeState::new(position.entry_price));
        let state: &mut ExitRuntimeState = &mut state_ref;

        let decision = match check_stop_loss(position, &strategy, current_price) {
            Some(d) => Some(d),
            None => match check_trailing_stop(state, position, &strategy, current_price) {
                Some(d) => Some(d),
                None => match check_take_profit(state, position, &strategy, current_price) {
                    Some(d) => Some(d),
                    None => match check_max_hold(position, &strategy, now) {
                        Some(d) => Some(d),
                        None => check_stagnation(state, position, &strategy, current_price, now),
                    },
                },
            },
        };

        let Some(decision) = decision else {
            return Ok(());
        };
        drop(state_ref);

        if decision.tokens_to_sell <= Decimal::ZERO {
            return Ok(());
        }

        let order = Order::new_exit(
            position.id,
            position.token.clone(),
            decision.tokens_to_sell,
            current_price,
            self.max_slippage_bps,
            decision.reason,
            self.max_attempts,
            position.is_simulated,
        );

        info!(
            position_id = %position.id,
            reason = ?decision.reason,
            tokens = %decision.tokens_to_sell,
            "exit rule fired"
        );
        self.queue.enqueue(order).await;

        // Record the TP-fired flag only after the EXIT order is safely
        // enqueued, not before: if this task were aborted mid-enqueue, a
        // flag written first would permanently suppress a rung that never
        // actually went out.
        if decision.tokens_to_sell >= position.current_amount_tokens {
            self.runtime_state.remove(&position.id);
        } else if let Some(level) = decision.tp_level_index {
            self.runtime_state
                .entry(position.id)
                .or_insert_with(|| ExitRuntimeState::new(position.entry_price))
                .tp_levels_fired
                .insert(level);
        }

        Ok(())
    }
}

/// Tokens permanently exempted from exit selling by the strategy's moonbag
/// configuration, computed against the position's original entry size.
fn moonbag_reserve_tokens(position: &Position, strategy: &ExitStrategy) -> Decimal {
    strategy
        .moonbag
        .as_ref()
        .map(|m| position.entry_amount_tokens * m.fraction)
        .unwrap_or(Decimal::ZERO)
}

/// Stop-loss exempts only the narrower `moonbag.stop_loss_fraction` reserve,
/// not the full moonbag — a losing position still dumps most of the bag.
fn check_stop_loss(position: &Position, strategy: &ExitStrategy, current_price: Decimal) -> Option<ExitDecision> {
    let trigger_price = position.entry_price * (Decimal::ONE - strategy.stop_loss_fraction);
    if current_price > trigger_price {
        return None;
    }

    let reserve_fraction = strategy.moonbag.as_ref().map(|m| m.stop_loss_fraction).unwrap_or(Decimal::ZERO);
    let reserve = position.entry_amount_tokens * reserve_fraction;
    let sellable = (position.current_amount_tokens - reserve).max(Decimal::ZERO);
    if sellable <= Decimal::ZERO {
        return None;
    }

    Some(ExitDecision {
        tokens_to_sell: sellable,
        reason: ExitReason::StopLoss,
        tp_level_index: None,
    })
}

/// Arms once price reaches `activation_multiplier` of entry, then trails the
/// peak price by `distance_fraction`. Fires a full liquidation, including
/// the moonbag, once price pulls back below the trailing line.
fn check_trailing_stop(
    state: &mut ExitRuntimeState,
    position: &Position,
    strategy: &ExitStrategy,
    current_price: Decimal,
) -> Option<ExitDecision> {
    if !strategy.trailing_stop.enabled {
        return None;
    }

    let activation_price = position.entry_price * strategy.trailing_stop.activation_multiplier;
    if !state.trailing_armed {
        if current_price >= activation_price {
            state.trailing_armed = true;
            state.peak_since_armed = current_price;
        }
        return None;
    }

    if current_price > state.peak_since_armed {
        state.peak_since_armed = current_price;
    }

    let trigger_price = state.peak_since_armed * (Decimal::ONE - strategy.trailing_stop.distance_fraction);
    if current_price > trigger_price {
        return None;
    }

    Some(ExitDecision {
        tokens_to_sell: position.current_amount_tokens,
        reason: ExitReason::TrailingStop,
        tp_level_index: None,
    })
}

/// Walks the ladder in order and fires the first rung not yet taken whose
/// trigger multiplier has been reached. The sold amount is clamped so the
/// moonbag reserve is never touched.
fn check_take_profit(
    state: &mut ExitRuntimeState,
    position: &Position,
    strategy: &ExitStrategy,
    current_price: Decimal,
) -> Option<ExitDecision> {
    for (index, level) in strategy.take_profit_levels.iter().enumerate() {
        if state.tp_levels_fired.contains(&index) {
            continue;
        }
        let trigger_price = position.entry_price * level.trigger_multiplier;
        if current_price < trigger_price {
            continue;
        }

        let raw_amount = position.entry_amount_tokens * level.sell_fraction;
        let moonbag_reserve = moonbag_reserve_tokens(position, strategy);
        let sellable_cap = (position.current_amount_tokens - moonbag_reserve).max(Decimal::ZERO);
        let amount = raw_amount.min(sellable_cap);

        return Some(ExitDecision {
            tokens_to_sell: amount,
            reason: ExitReason::TakeProfit,
            tp_level_index: Some(index),
        });
    }
    None
}

/// Force-closes the entire remaining position, including the moonbag, once
/// `max_hold_hours` has elapsed since entry.
fn check_max_hold(position: &Position, strategy: &ExitStrategy, now: DateTime<Utc>) -> Option<ExitDecision> {
    let max_hold_hours = strategy.time_rules.max_hold_hours?;
    let elapsed_hours = (now - position.entry_time).num_seconds() as f64 / 3600.0;
    if elapsed_hours < max_hold_hours as f64 {
        return None;
    }

    Some(ExitDecision {
        tokens_to_sell: position.current_amount_tokens,
        reason: ExitReason::TimeLimit,
        tp_level_index: None,
    })
}

/// A position is stagnant once its price has failed to move by
/// `stagnation_threshold_pct` for `stagnation_hours`. Exempts the moonbag.
fn check_stagnation(
    state: &mut ExitRuntimeState,
    position: &Position,
    strategy: &ExitStrategy,
    current_price: Decimal,
    now: DateTime<Utc>,
) -> Option<ExitDecision> {
    if !strategy.time_rules.stagnation_enabled {
        return None;
    }

    state.stagnation_window.maybe_reset(current_price, strategy.time_rules.stagnation_threshold_pct);
    if state.stagnation_window.hours_elapsed(now) < strategy.time_rules.stagnation_hours as f64 {
        return None;
    }

    let moonbag_reserve = moonbag_reserve_tokens(position, strategy);
    let sellable = (position.current_amount_tokens - moonbag_reserve).max(Decimal::ZERO);
    if sellable <= Decimal::ZERO {
        return None;
    }

    Some(ExitDecision {
        tokens_to_sell: sellable,
        reason: ExitReason::Stagnation,
        tp_level_index: None,
    })
}
