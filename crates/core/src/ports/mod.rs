//! Narrow trait boundaries between core domain logic and the outside world.
//! Nothing under `crates/core` depends on a concrete adapter; composition
//! happens in the gateway binary.

pub mod alerting;
pub mod assignment;
pub mod price_feed;
pub mod repository;
pub mod signer;
pub mod swap_adapter;
pub mod token_safety;

pub use alerting::{Alert, Alerting, Severity};
pub use assignment::ExitStrategyAssigner;
pub use price_feed::PriceFeed;
pub use repository::{
    BlockedSignalRepository, CapitalRepository, CircuitBreakerRepository, ClusterRepository,
    ExitStrategyRepository, OrderRepository, PositionRepository, SignalLogRepository,
    WalletRepository,
};
pub use signer::Signer;
pub use swap_adapter::{Quote, SwapAdapter, SwapReceipt};
pub use token_safety::TokenSafety;
