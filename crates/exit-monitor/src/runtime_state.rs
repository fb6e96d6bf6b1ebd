//! Per-position evaluation state the monitor (C10) must remember between
//! ticks so replays stay idempotent: which take-profit levels have already
//! fired, whether the trailing stop is armed, and the stagnation window.

use std::collections::HashSet;

use rust_decimal::Decimal;
use trading_core::types::strategy::StagnationWindow;

#[derive(Debug, Clone)]
pub struct ExitRuntimeState {
    pub tp_levels_fired: HashSet<usize>,
    pub trailing_armed: bool,
    pub peak_since_armed: Decimal,
    pub stagnation_window: StagnationWindow,
}

impl ExitRuntimeState {
    pub fn new(entry_price: Decimal) -> Self {
        Self {
            tp_levels_fired: HashSet::new(),
            trailing_armed: false,
            peak_since_armed: Decimal::ZERO,
            stagnation_window: StagnationWindow::start(entry_price),
        }
    }
}
