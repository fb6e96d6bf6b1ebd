//! Port for operator-facing alerts. No delivery implementation (Telegram,
//! Discord, ...) lives in this workspace.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    pub title: String,
    pub body: String,
}

#[async_trait]
pub trait Alerting: Send + Sync {
    async fn send(&self, alert: Alert) -> Result<()>;
}
