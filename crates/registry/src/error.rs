//! Registry error types.

use thiserror::Error;

/// Registry operation errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no upload recorded for file name: {0}")]
    NotFound(String),

    #[error("registry unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("corrupt association for {file_name}: {reason}")]
    Corrupt { file_name: String, reason: String },
}

impl RegistryError {
    /// Whether the failure is a missing association rather than a backend problem.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
