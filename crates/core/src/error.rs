//! Error types shared across the signal and execution control plane.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid webhook signal: {0}")]
    InvalidSignal(String),

    #[error("invalid order state transition: {0}")]
    InvalidOrderTransition(String),

    #[error("sizing rejected: {0}")]
    SizingRejected(String),

    #[error("webhook signature verification failed")]
    WebhookSignatureInvalid,

    #[error("adapter error: {0}")]
    Adapter(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("resume rejected: {0}")]
    ResumeRejected(String),
}

pub type Result<T> = std::result::Result<T, Error>;
