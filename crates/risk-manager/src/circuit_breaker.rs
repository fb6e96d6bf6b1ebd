//! Daily-loss and drawdown circuit breaker (C6). Blocks ENTRY orders only;
//! EXIT orders always flow through regardless of breaker state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use trading_core::config::RiskConfig;
use trading_core::error::Result;
use trading_core::ports::alerting::{Alert, Alerting, Severity};
use trading_core::ports::CircuitBreakerRepository;
use trading_core::types::risk::{CircuitBreakerTrigger, DailyLossMetrics, TriggerReason};

/// Tracks capital against a monotonic peak watermark and a per-day starting
/// balance, and decides whether entry trading should halt.
pub struct CircuitBreaker {
    config: Arc<RwLock<RiskConfig>>,
    day_start_capital: RwLock<Decimal>,
    peak_capital: RwLock<Decimal>,
    current_capital: RwLock<Decimal>,
    /// Fast path: false once either limit has been breached.
    entry_allowed: AtomicBool,
    last_trip_reason: RwLock<Option<TriggerReason>>,
    last_trip_id: RwLock<Option<uuid::Uuid>>,
    repo: Option<Arc<dyn CircuitBreakerRepository>>,
    alerting: Option<Arc<dyn Alerting>>,
}

impl CircuitBreaker {
    pub fn new(config: RiskConfig) -> Self {
        let floor = config.starting_capital_floor_sol;
        Self {
            config: Arc::new(RwLock::new(config)),
            day_start_capital: RwLock::new(floor),
            peak_capital: RwLock::new(floor),
            current_capital: RwLock::new(floor),
            entry_allowed: AtomicBool::new(true),
            last_trip_reason: RwLock::new(None),
            last_trip_id: RwLock::new(None),
            repo: None,
            alerting: None,
        }
    }

    pub fn with_repository(config: RiskConfig, repo: Arc<dyn CircuitBreakerRepository>) -> Self {
        let mut breaker = Self::new(config);
        breaker.repo = Some(repo);
        breaker
    }

    /// Attach an alerting sink so a trip can page an operator. Chainable with
    /// `with_repository`.
    pub fn with_alerting(mut self, alerting: Arc<dyn Alerting>) -> Self {
        self.alerting = Some(alerting);
        self
    }

    /// Seed capital following spec §4.6's starting-capital priority chain:
    /// last known snapshot -> sum of currently open positions' entry SOL ->
    /// configured floor. The snapshot resolution (today's vs. the last one
    /// before today) happens at the call site, which passes whichever one
    /// it found as `last_known`.
    pub async fn seed_capital(&self, last_known: Option<Decimal>, open_positions_entry_sol_sum: Decimal) {
        let config = self.config.read().await;
        let starting = last_known
            .filter(|c| *c > Decimal::ZERO)
            .or_else(|| Some(open_positions_entry_sol_sum).filter(|s| *s > Decimal::ZERO))
            .unwrap_or(config.starting_capital_floor_sol);

        *self.day_start_capital.write().await = starting;
        *self.peak_capital.write().await = starting;
        *self.current_capital.write().await = starting;
    }

    /// Fast path: is entry trading currently allowed.
    pub fn entry_allowed(&self) -> bool {
        self.entry_allowed.load(Ordering::SeqCst)
    }

    /// Why entry trading is currently blocked, if it is. Used to annotate a
    /// `BlockedSignal` audit row with the gate that suppressed it.
    pub async fn last_trip_reason(&self) -> Option<TriggerReason> {
        *self.last_trip_reason.read().await
    }

    /// Roll the day-start balance forward. Clears a daily-loss trip (but not
    /// a drawdown trip, which requires operator resume).
    pub async fn reset_daily(&self) {
        let current = *self.current_capital.read().await;
        *self.day_start_capital.write().await = current;
        info!(day_start_capital = %current, "risk gate daily reset");
    }

    /// Update current capital after a fill and re-evaluate both limits.
    /// Returns the trigger, if any, that newly halted entry trading.
    pub async fn update_capital(&self, current_capital_sol: Decimal) -> Result<Option<TriggerReason>> {
        *self.current_capital.write().await = current_capital_sol;
        {
            let mut peak = self.peak_capital.write().await;
            if current_capital_sol > *peak {
                *peak = current_capital_sol;
            }
        }

        let metrics = self.daily_loss_metrics().await;
        let config = self.config.read().await;

        if metrics.is_over_limit() {
            return Ok(Some(self.trip(TriggerReason::DailyLossLimit, metrics.daily_loss_pct, metrics.limit_pct).await));
        }
        if metrics.is_in_warning_zone() {
            warn!(
                daily_loss_pct = %metrics.daily_loss_pct,
                warning_threshold_pct = %metrics.warning_threshold_pct,
                "daily loss entered warning zone"
            );
        }

        let peak = *self.peak_capital.read().await;
        if peak > Decimal::ZERO {
            let drawdown_pct = ((peak - current_capital_sol) / peak) * Decimal::new(100, 0);
            if drawdown_pct >= config.drawdown_limit_pct {
                return Ok(Some(self.trip(TriggerReason::DrawdownLimit, drawdown_pct, config.drawdown_limit_pct).await));
            }
        }

        Ok(None)
    }

    pub async fn daily_loss_metrics(&self) -> DailyLossMetrics {
        let config = self.config.read().await;
        let day_start = *self.day_start_capital.read().await;
        let current = *self.current_capital.read().await;
        let realized_pnl = current - day_start;
        let daily_loss_pct = if day_start > Decimal::ZERO && realized_pnl < Decimal::ZERO {
            (realized_pnl.abs() / day_start) * Decimal::new(100, 0)
        } else {
            Decimal::ZERO
        };

        DailyLossMetrics {
            day_start_capital_sol: day_start,
            current_capital_sol: current,
            realized_pnl_sol: realized_pnl,
            daily_loss_pct,
            warning_threshold_pct: config.daily_loss_warning_pct,
            limit_pct: config.daily_loss_limit_pct,
        }
    }

    async fn trip(&self, reason: TriggerReason, metric_value_pct: Decimal, limit_pct: Decimal) -> TriggerReason {
        self.entry_allowed.store(false, Ordering::SeqCst);
        *self.last_trip_reason.write().await = Some(reason);

        error!(reason = ?reason, metric_value_pct = %metric_value_pct, limit_pct = %limit_pct, "circuit breaker tripped, entry trading halted");

        let trigger = CircuitBreakerTrigger {
            id: uuid::Uuid::new_v4(),
            reason,
            metric_value_pct,
            limit_pct,
            triggered_at: Utc::now(),
            active: true,
        };
        *self.last_trip_id.write().await = Some(trigger.id);

        if let Some(repo) = &self.repo {
            if let Err(e) = repo.record_trigger(&trigger).await {
                error!(error = %e, "failed to persist circuit breaker trigger");
            }
        }

        if let Some(alerting) = &self.alerting {
            let alert = Alert {
                severity: Severity::Critical,
                title: "circuit breaker tripped".to_string(),
                body: format!("reason={reason:?} metric_value_pct={metric_value_pct} limit_pct={limit_pct}"),
            };
            if let Err(e) = alerting.send(alert).await {
                error!(error = %e, "failed to send circuit breaker trip alert");
            }
        }

        reason
    }

    /// Operator override: re-allow entry trading regardless of trip reason.
    /// Does not reset the daily-loss or peak-capital watermarks. Persists the
    /// reset against the trigger that most recently tripped, if any, so the
    /// audit trail records who authorized resuming entries.
    pub async fn force_allow_entry(&self, operator_id: &str) {
        self.entry_allowed.store(true, Ordering::SeqCst);

        let trip_id = self.last_trip_id.write().await.take();
        if let (Some(id), Some(repo)) = (trip_id, &self.repo) {
            if let Err(e) = repo.reset_trigger(id, operator_id).await {
                error!(error = %e, "failed to persist circuit breaker trigger reset");
            }
        }
    }

    /// Clear the remembered trip reason once trading has actually resumed,
    /// so subsequent blocked-signal records (if trading trips again) reflect
    /// the new trigger rather than a stale one.
    pub async fn clear_trip_reason(&self) {
        *self.last_trip_reason.write().await = None;
    }

    pub async fn update_config(&self, config: RiskConfig) {
        *self.config.write().await = config;
        info!("risk gate config updated");
    }

    pub async fn config(&self) -> RiskConfig {
        self.config.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RiskConfig {
        RiskConfig {
            daily_loss_warning_pct: Decimal::new(8, 0),
            daily_loss_limit_pct: Decimal::new(10, 0),
            drawdown_limit_pct: Decimal::new(20, 0),
            starting_capital_floor_sol: Decimal::new(10, 0),
        }
    }

    #[tokio::test]
    async fn test_daily_loss_limit_trips_and_blocks_entry() {
        let breaker = CircuitBreaker::new(test_config());
        breaker.seed_capital(Some(Decimal::new(100, 0)), Decimal::ZERO).await;

        let reason = breaker.update_capital(Decimal::new(89, 0)).await.unwrap();
        assert_eq!(reason, Some(TriggerReason::DailyLossLimit));
        assert!(!breaker.entry_allowed());
    }

    #[tokio::test]
    async fn test_below_warning_zone_does_not_trip() {
        let breaker = CircuitBreaker::new(test_config());
        breaker.seed_capital(Some(Decimal::new(100, 0)), Decimal::ZERO).await;

        let reason = breaker.update_capital(Decimal::new(95, 0)).await.unwrap();
        assert!(reason.is_none());
        assert!(breaker.entry_allowed());
    }

    #[tokio::test]
    async fn test_drawdown_from_peak_trips_even_after_partial_recovery() {
        let breaker = CircuitBreaker::new(test_config());
        breaker.seed_capital(Some(Decimal::new(100, 0)), Decimal::ZERO).await;

        // Peak rises to 200.
        breaker.update_capital(Decimal::new(200, 0)).await.unwrap();
        // Drops to 150: 25% drawdown from peak, beyond the 20% limit, even
        // though this is still a gain versus the day start of 100.
        let reason = breaker.update_capital(Decimal::new(150, 0)).await.unwrap();
        assert_eq!(reason, Some(TriggerReason::DrawdownLimit));
    }

    #[tokio::test]
    async fn test_seed_capital_falls_back_to_floor() {
        let breaker = CircuitBreaker::new(test_config());
        breaker.seed_capital(None, Decimal::ZERO).await;
        let metrics = breaker.daily_loss_metrics().await;
        assert_eq!(metrics.day_start_capital_sol, Decimal::new(10, 0));
    }

    #[tokio::test]
    async fn test_force_allow_entry_clears_trip() {
        let breaker = CircuitBreaker::new(test_config());
        breaker.seed_capital(Some(Decimal::new(100, 0)), Decimal::ZERO).await;
        breaker.update_capital(Decimal::new(89, 0)).await.unwrap();
        assert!(!breaker.entry_allowed());

        breaker.force_allow_entry("operator-1").await;
        assert!(breaker.entry_allowed());
    }

    #[tokio::test]
    async fn test_last_trip_reason_tracks_then_clears() {
        let breaker = CircuitBreaker::new(test_config());
        breaker.seed_capital(Some(Decimal::new(100, 0)), Decimal::ZERO).await;
        assert_eq!(breaker.last_trip_reason().await, None);

        breaker.update_capital(Decimal::new(89, 0)).await.unwrap();
        assert_eq!(breaker.last_trip_reason().await, Some(TriggerReason::DailyLossLimit));

        breaker.clear_trip_reason().await;
        assert_eq!(breaker.last_trip_reason().await, None);
    }
}
