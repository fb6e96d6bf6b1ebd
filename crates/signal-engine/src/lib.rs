//! Wallet filter, signal scorer, threshold gate, and async signal log
//! (C2-C5).

pub mod filter;
pub mod scorer;
pub mod signal_log;

pub use filter::SignalFilter;
pub use scorer::SignalScorer;
pub use signal_log::SignalLog;
