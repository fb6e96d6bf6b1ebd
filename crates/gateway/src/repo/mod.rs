//! `sqlx`-backed persistence adapters for the ports `core` declares,
//! following `risk_manager::circuit_breaker_repo`'s raw-query style: one
//! thin struct per table, wrapping a shared `PgPool`.

pub mod cluster;
pub mod exit_strategy;
pub mod order;
pub mod position;
pub mod signal_log;
pub mod wallet;

pub use cluster::PgClusterRepository;
pub use exit_strategy::PgExitStrategyRepository;
pub use order::PgOrderRepository;
pub use position::PgPositionRepository;
pub use signal_log::PgSignalLogRepository;
pub use wallet::PgWalletRepository;
