//! Error types for the metadata subsystem.

use thiserror::Error;

/// Result type alias for record store operations.
pub type MetaResult<T> = Result<T, MetaError>;

/// Error variants for record store operations.
#[derive(Debug, Error)]
pub enum MetaError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file holds something other than a record list.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record with this id already exists.
    #[error("Duplicate record id: {0}")]
    DuplicateId(String),
}
