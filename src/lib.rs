//! Smart-money on-chain swap-signal trading control plane.
//!
//! This is the root crate that provides benchmark and example access to the
//! internal modules. For actual functionality, use the individual crates
//! directly:
//!
//! - `trading-core`: Core types, config, error handling, ports
//! - `wallet-cache`: Wallet metadata caching with TTL eviction
//! - `signal-engine`: Signal filtering, scoring, and logging
//! - `risk-manager`: Circuit breaker, capital tracking, pause/resume
//! - `position-sizer`: Risk-gated position sizing
//! - `order-engine`: Order priority queue and lifecycle executor
//! - `exit-monitor`: Exit-strategy evaluation and strategy assignment
//! - `gateway`: Webhook HTTP adapter and composition root (binary)

// Re-export for benchmarks and examples
pub use exit_monitor;
pub use order_engine;
pub use position_sizer;
pub use risk_manager;
pub use signal_engine;
pub use trading_core as core;
pub use wallet_cache;
