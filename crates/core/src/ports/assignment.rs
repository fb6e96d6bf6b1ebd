//! Port for exit-strategy assignment (C11), kept separate from
//! `ExitStrategyRepository` so the order executor can persist an assignment
//! without depending on `exit-monitor`'s scoring/override logic directly.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::Result;
use crate::types::position::ConvictionTier;

#[async_trait]
pub trait ExitStrategyAssigner: Send + Sync {
    async fn assign(&self, position_id: Uuid, signal_score: Decimal, conviction_tier: ConvictionTier) -> Result<()>;
}
