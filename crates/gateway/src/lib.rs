//! Webhook HTTP adapter and composition root for the trading control plane.
//!
//! Everything that isn't pure domain logic lives here: the `Pg*Repository`
//! adapters, the paper-trading port implementations, HMAC verification and
//! Helius payload parsing, and HTTP-facing error mapping. `main.rs` wires
//! these together with the crates under `crates/` into a running service.

pub mod error;
pub mod repo;
pub mod sim_adapters;
pub mod webhook;

pub use error::{ErrorResponse, GatewayError, GatewayResult};
