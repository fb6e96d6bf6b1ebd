//! Paper-trading implementations of the execution-side ports
//! (`PriceFeed`, `SwapAdapter`, `Signer`, `TokenSafety`, `Alerting`).
//!
//! No real DEX/price/signing/safety adapter lives in this workspace by
//! design; these fill the ports with a deterministic, side-effect-free
//! simulation so the composition root has something to wire in and every
//! order the gateway submits carries `is_simulated = true`. Swapping in a
//! real adapter later is a matter of implementing the same trait.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::info;
use trading_core::error::Result;
use trading_core::ports::alerting::{Alert, Alerting};
use trading_core::ports::price_feed::PriceFeed;
use trading_core::ports::signer::Signer;
use trading_core::ports::swap_adapter::{Quote, SwapAdapter, SwapReceipt};
use trading_core::ports::token_safety::TokenSafety;
use trading_core::types::order::{Order, OrderSide};

/// Fixed-price feed seeded from the entry price carried on the swap
/// signal. Holds the price steady so downstream exit-rule tests against it
/// are deterministic; a real implementation would poll Jupiter/Birdeye.
pub struct SimulatedPriceFeed {
    prices: DashMap<String, Decimal>,
    default_price: Decimal,
}

impl SimulatedPriceFeed {
    pub fn new(default_price: Decimal) -> Self {
        Self { prices: DashMap::new(), default_price }
    }

    pub fn set_price(&self, token: &str, price: Decimal) {
        self.prices.insert(token.to_string(), price);
    }
}

#[async_trait]
impl PriceFeed for SimulatedPriceFeed {
    async fn current_price_sol(&self, token: &str) -> Result<Decimal> {
        Ok(self.prices.get(token).map(|p| *p).unwrap_or(self.default_price))
    }
}

/// Fills every quote and submission at the order's expected price with no
/// slippage. `SwapAdapter::quote` is read-only per the port contract;
/// `submit` is the only simulated side effect.
pub struct SimulatedSwapAdapter;

#[async_trait]
impl SwapAdapter for SimulatedSwapAdapter {
    async fn quote(&self, _token: &str, _side: OrderSide, _amount_sol: Decimal, _max_slippage_bps: u32) -> Result<Quote> {
        Ok(Quote {
            expected_price: Decimal::ZERO,
            price_impact_bps: 0,
            route: "simulated".to_string(),
        })
    }

    async fn submit(&self, order: &Order, quote: &Quote, _signed_tx: &[u8]) -> Result<SwapReceipt> {
        let price = if quote.expected_price.is_zero() { order.expected_price } else { quote.expected_price };
        let amount_tokens = order
            .amount_tokens
            .unwrap_or_else(|| if price.is_zero() { Decimal::ZERO } else { order.amount_sol / price });
        Ok(SwapReceipt {
            tx_signature: format!("simulated-{}", order.id),
            actual_price: price,
            amount_tokens,
        })
    }
}

/// Does not hold a real key; returns the order bytes unchanged so the
/// simulated swap adapter has something to "submit".
pub struct SimulatedSigner {
    public_key: String,
}

impl SimulatedSigner {
    pub fn new(public_key: impl Into<String>) -> Self {
        Self { public_key: public_key.into() }
    }
}

#[async_trait]
impl Signer for SimulatedSigner {
    async fn sign(&self, tx_bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(tx_bytes.to_vec())
    }

    fn public_key(&self) -> String {
        self.public_key.clone()
    }
}

/// Passes every token as safe. A real implementation would check a
/// rugcheck/honeypot service; wiring one in only requires swapping this
/// struct out for another `TokenSafety` impl.
pub struct AllowAllTokenSafety;

#[async_trait]
impl TokenSafety for AllowAllTokenSafety {
    async fn is_safe(&self, _token: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Logs alerts via `tracing` instead of delivering them to Telegram/Discord.
pub struct LoggingAlerting;

#[async_trait]
impl Alerting for LoggingAlerting {
    async fn send(&self, alert: Alert) -> Result<()> {
        info!(severity = ?alert.severity, title = %alert.title, body = %alert.body, "alert");
        Ok(())
    }
}

pub fn simulated_price_feed(default_price: Decimal) -> Arc<dyn PriceFeed> {
    Arc::new(SimulatedPriceFeed::new(default_price))
}

pub fn simulated_swap_adapter() -> Arc<dyn SwapAdapter> {
    Arc::new(SimulatedSwapAdapter)
}

pub fn simulated_signer(public_key: impl Into<String>) -> Arc<dyn Signer> {
    Arc::new(SimulatedSigner::new(public_key))
}

pub fn allow_all_token_safety() -> Arc<dyn TokenSafety> {
    Arc::new(AllowAllTokenSafety)
}

pub fn logging_alerting() -> Arc<dyn Alerting> {
    Arc::new(LoggingAlerting)
}
