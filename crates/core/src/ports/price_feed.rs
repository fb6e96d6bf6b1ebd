//! Port for fetching current token prices. No implementation lives in this
//! workspace; adapters (Jupiter, Birdeye, ...) are out of scope.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;

#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Current price of `token`, denominated in SOL.
    async fn current_price_sol(&self, token: &str) -> Result<Decimal>;
}
