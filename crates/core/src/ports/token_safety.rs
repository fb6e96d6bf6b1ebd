//! Binary token-safety gate consulted by the scorer (C3/C4). No concrete
//! rugcheck/honeypot-detector implementation lives in this workspace.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait TokenSafety: Send + Sync {
    async fn is_safe(&self, token: &str) -> Result<bool>;
}
