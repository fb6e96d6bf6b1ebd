//! Port for executing on-chain swaps. No DEX adapter implementation lives in
//! this workspace.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::types::order::{Order, OrderSide};

/// A quote for a prospective swap, obtained before submitting the order.
#[derive(Debug, Clone)]
pub struct Quote {
    pub expected_price: Decimal,
    pub price_impact_bps: u32,
    pub route: String,
}

/// Result of submitting a signed swap transaction.
#[derive(Debug, Clone)]
pub struct SwapReceipt {
    pub tx_signature: String,
    pub actual_price: Decimal,
    pub amount_tokens: Decimal,
}

#[async_trait]
pub trait SwapAdapter: Send + Sync {
    async fn quote(
        &self,
        token: &str,
        side: OrderSide,
        amount_sol: Decimal,
        max_slippage_bps: u32,
    ) -> Result<Quote>;

    async fn submit(&self, order: &Order, quote: &Quote, signed_tx: &[u8]) -> Result<SwapReceipt>;
}
