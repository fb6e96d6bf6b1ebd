//! System-wide pause/resume state (C12), independent of why a pause was
//! requested: an operator click and a circuit breaker trip both flow
//! through the same audit trail.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use trading_core::error::{Error, Result};
use trading_core::ports::CircuitBreakerRepository;
use trading_core::types::risk::{PauseReason, PauseResumeEvent, SystemStatus};

use crate::circuit_breaker::CircuitBreaker;

pub struct SystemStateManager {
    status: RwLock<SystemStatus>,
    /// Fast path mirroring `status != Running`.
    paused: AtomicBool,
    repo: Option<Arc<dyn CircuitBreakerRepository>>,
    /// When set, a resume out of `PausedCircuitBreaker` also clears the
    /// breaker's own trip so entries aren't blocked twice over.
    circuit_breaker: Option<Arc<CircuitBreaker>>,
}

impl SystemStateManager {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(SystemStatus::Running),
            paused: AtomicBool::new(false),
            repo: None,
            circuit_breaker: None,
        }
    }

    pub fn with_repository(repo: Arc<dyn CircuitBreakerRepository>) -> Self {
        let mut manager = Self::new();
        manager.repo = Some(repo);
        manager
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = Some(circuit_breaker);
        self
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> SystemStatus {
        *self.status.read().await
    }

    /// A no-op (with a warning log, not an error) if the system is already
    /// paused — the first pause reason wins and stays on record.
    pub async fn pause(&self, status: SystemStatus, reason: PauseReason, operator_id: Option<String>, note: Option<String>) -> Result<()> {
        let mut current = self.status.write().await;
        if *current != SystemStatus::Running {
            warn!(current = ?*current, attempted = ?status, ?reason, "pause requested while already paused, ignoring");
            return Ok(());
        }
        let previous = *current;
        *current = status;
        self.paused.store(true, Ordering::SeqCst);
        drop(current);

        warn!(?previous, new_status = ?status, ?reason, "system entered paused state");
        self.record(previous, status, Some(reason), operator_id, note).await
    }

    /// Operator-initiated resume. Resuming out of `PausedManual` needs no
    /// acknowledgement; resuming out of any other paused status requires
    /// `acknowledge_warning = true`, since those pauses were raised by the
    /// risk gate itself rather than requested by a human.
    pub async fn resume(&self, operator_id: String, acknowledge_warning: bool, note: Option<String>) -> Result<()> {
        let mut current = self.status.write().await;
        let previous = *current;

        if previous != SystemStatus::Running && previous != SystemStatus::PausedManual && !acknowledge_warning {
            return Err(Error::ResumeRejected(format!(
                "resuming from {previous:?} requires acknowledge_warning=true"
            )));
        }

        *current = SystemStatus::Running;
        self.paused.store(false, Ordering::SeqCst);
        drop(current);

        if previous == SystemStatus::PausedCircuitBreaker {
            if let Some(breaker) = &self.circuit_breaker {
                breaker.force_allow_entry(&operator_id).await;
                breaker.clear_trip_reason().await;
            }
        }

        info!(?previous, operator_id = %operator_id, "system resumed by operator");
        self.record(previous, SystemStatus::Running, None, Some(operator_id), note).await
    }

    /// Automatic resume from a daily-loss pause at the start of a new
    /// trading day. Does not clear a drawdown pause, which always requires
    /// an explicit operator resume.
    pub async fn auto_resume_daily_reset(&self) -> Result<bool> {
        let mut current = self.status.write().await;
        if *current != SystemStatus::PausedCircuitBreaker {
            return Ok(false);
        }
        let previous = *current;
        *current = SystemStatus::Running;
        self.paused.store(false, Ordering::SeqCst);
        drop(current);

        if let Some(breaker) = &self.circuit_breaker {
            breaker.force_allow_entry("system:daily_reset").await;
            breaker.clear_trip_reason().await;
        }

        info!("system auto-resumed on daily reset");
        self.record(previous, SystemStatus::Running, None, None, Some("daily reset".to_string())).await?;
        Ok(true)
    }

    async fn record(
        &self,
        previous_status: SystemStatus,
        new_status: SystemStatus,
        reason: Option<PauseReason>,
        operator_id: Option<String>,
        note: Option<String>,
    ) -> Result<()> {
        let event_type = if new_status == SystemStatus::Running {
            "resume"
        } else {
            "pause"
        };

        let event = PauseResumeEvent {
            id: uuid::Uuid::new_v4(),
            event_type: event_type.to_string(),
            operator_id,
            previous_status,
            new_status,
            reason,
            note,
            occurred_at: Utc::now(),
        };

        if let Some(repo) = &self.repo {
            repo.record_pause_resume(&event).await?;
        }
        Ok(())
    }
}

impl Default for SystemStateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_core::config::RiskConfig;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_pause_then_operator_resume() {
        let manager = SystemStateManager::new();
        manager
            .pause(SystemStatus::PausedManual, PauseReason::Operator, Some("ops-1".to_string()), None)
            .await
            .unwrap();
        assert!(manager.is_paused());

        manager.resume("ops-1".to_string(), false, None).await.unwrap();
        assert!(!manager.is_paused());
        assert_eq!(manager.status().await, SystemStatus::Running);
    }

    #[tokio::test]
    async fn test_second_pause_while_paused_is_noop() {
        let manager = SystemStateManager::new();
        manager
            .pause(SystemStatus::PausedManual, PauseReason::Operator, Some("ops-1".to_string()), None)
            .await
            .unwrap();
        manager
            .pause(SystemStatus::PausedCircuitBreaker, PauseReason::DailyLossLimit, None, None)
            .await
            .unwrap();

        assert_eq!(manager.status().await, SystemStatus::PausedManual);
    }

    #[tokio::test]
    async fn test_resume_from_circuit_breaker_pause_without_ack_is_rejected() {
        let manager = SystemStateManager::new();
        manager
            .pause(SystemStatus::PausedCircuitBreaker, PauseReason::DailyLossLimit, None, None)
            .await
            .unwrap();

        let err = manager.resume("ops-1".to_string(), false, None).await.unwrap_err();
        assert!(matches!(err, Error::ResumeRejected(_)));
        assert!(manager.is_paused());
    }

    #[tokio::test]
    async fn test_resume_from_circuit_breaker_pause_with_ack_succeeds_and_clears_breaker() {
        let riskcfg = RiskConfig {
            daily_loss_warning_pct: Decimal::new(8, 0),
            daily_loss_limit_pct: Decimal::new(10, 0),
            drawdown_limit_pct: Decimal::new(20, 0),
            starting_capital_floor_sol: Decimal::new(10, 0),
        };
        let breaker = Arc::new(CircuitBreaker::new(riskcfg));
        breaker.seed_capital(Some(Decimal::new(100, 0)), Decimal::ZERO).await;
        breaker.update_capital(Decimal::new(85, 0)).await.unwrap();
        assert!(!breaker.entry_allowed());

        let manager = SystemStateManager::new().with_circuit_breaker(breaker.clone());
        manager
            .pause(SystemStatus::PausedCircuitBreaker, PauseReason::DailyLossLimit, None, None)
            .await
            .unwrap();

        manager.resume("ops-1".to_string(), true, None).await.unwrap();
        assert!(!manager.is_paused());
        assert!(breaker.entry_allowed());
    }

    #[tokio::test]
    async fn test_auto_resume_only_clears_circuit_breaker_pause() {
        let manager = SystemStateManager::new();
        manager
            .pause(SystemStatus::PausedManual, PauseReason::Operator, Some("ops-1".to_string()), None)
            .await
            .unwrap();

        let resumed = manager.auto_resume_daily_reset().await.unwrap();
        assert!(!resumed);
        assert!(manager.is_paused());
    }
}
