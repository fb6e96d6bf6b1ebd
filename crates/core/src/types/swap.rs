//! Webhook-sourced swap events.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Wrapped native SOL mint address used to identify the non-token leg of a swap.
pub const WRAPPED_SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Direction of a swap relative to the wallet that executed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDirection {
    Buy,
    Sell,
}

/// A parsed, immutable swap event produced by the webhook adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapEvent {
    pub tx_signature: String,
    pub wallet: String,
    pub token: String,
    pub direction: SwapDirection,
    pub amount_sol: Decimal,
    pub amount_token: Decimal,
    pub slot: u64,
    pub fee_lamports: u64,
    pub timestamp: DateTime<Utc>,
}

impl SwapEvent {
    pub fn new(
        tx_signature: String,
        wallet: String,
        token: String,
        direction: SwapDirection,
        amount_sol: Decimal,
        amount_token: Decimal,
        slot: u64,
        fee_lamports: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            tx_signature,
            wallet,
            token,
            direction,
            amount_sol,
            amount_token,
            slot,
            fee_lamports,
            timestamp,
        }
    }
}
