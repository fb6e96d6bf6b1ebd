//! Shared domain types, organized by the component that owns their lifecycle.

pub mod order;
pub mod position;
pub mod risk;
pub mod sizing;
pub mod strategy;
pub mod swap;
pub mod wallet;

pub use order::{Order, OrderKind, OrderSide, OrderStatus, ExitReason};
pub use position::{ConvictionTier, Position, PositionStatus};
pub use risk::{
    CapitalSnapshot, CircuitBreakerTrigger, DailyLossMetrics, PauseReason, PauseResumeEvent,
    SystemStatus, TriggerReason,
};
pub use sizing::{SizingAudit, SizingDecision, SizingOutcome};
pub use strategy::{
    AssignmentSource, ExitStrategy, ManualOverride, MoonbagConfig, ScoreStrategyRange,
    StagnationWindow, StrategyAssignment, TakeProfitLevel, TimeRules, TrailingStopConfig,
};
pub use swap::{SwapDirection, SwapEvent, WRAPPED_SOL_MINT};
pub use wallet::{FilterResult, FilterStatus, ScoredSignal, WalletMeta};
