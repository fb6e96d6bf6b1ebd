//! Exit-strategy evaluation and assignment (C10, C11).

pub mod monitor;
pub mod runtime_state;
pub mod strategy_assigner;

pub use monitor::ExitMonitor;
pub use runtime_state::ExitRuntimeState;
pub use strategy_assigner::StrategyAssigner;
