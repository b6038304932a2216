use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    /// Connection, statement and timeout failures all count as storage faults.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Timeout(_))
    }
}
