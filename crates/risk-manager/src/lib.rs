//! Daily-loss/drawdown circuit breaker and system pause/resume state (C6, C12).
//!
//! Stop-loss and trailing-stop evaluation lives in `exit-monitor`, not here:
//! this crate only gates whether new ENTRY orders may be placed at all.

pub mod circuit_breaker;
pub mod circuit_breaker_repo;
pub mod system_state;

pub use circuit_breaker::CircuitBreaker;
pub use circuit_breaker_repo::{PgBlockedSignalRepository, PgCapitalRepository, PgCircuitBreakerRepository};
pub use system_state::SystemStateManager;
