pub mod catalog;
pub mod record;
pub mod recommendation;
pub mod sync;

pub use catalog::*;
pub use record::*;
pub use recommendation::*;
pub use sync::*;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("transient i/o error: {0}")]
    Transient(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ServiceError::Validation(e.to_string())
        } else {
            // Timeouts, connect failures and interrupted transfers are all
            // retryable from the caller's point of view.
            ServiceError::Transient(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Coarse lifecycle of a shop's catalog sync run. `Pending` is the implicit
/// state before the first run; `Failed` is only reached when a run cannot
/// start at all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}
