//! Error types for the storage subsystem.

use pinvault_reduce::CodecError;
use thiserror::Error;

/// Result type alias for remote store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a [`crate::ContentStore`] backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No usable credential; raised before any network call.
    #[error("remote store credential is not configured")]
    Unconfigured,

    /// Network failure or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote store answered with an error status.
    #[error("remote store rejected request with status {status}: {message}")]
    Rejected {
        /// HTTP status code returned by the remote store.
        status: u16,
        /// Body or reason supplied with the status.
        message: String,
    },

    /// The remote store acknowledged the push but returned no content address.
    #[error("remote store returned no content address")]
    MissingAddress,

    /// No object exists under the address.
    #[error("object not found: {address}")]
    NotFound {
        /// The content address that was requested.
        address: String,
    },
}

/// Failures of [`crate::UploadOrchestrator::upload`].
///
/// A failed upload never yields a descriptor.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Credential missing; nothing was sent.
    #[error("remote store credential is not configured")]
    Unconfigured,

    /// Network failure or timeout while pushing.
    #[error("upload transport failure: {0}")]
    Transport(#[source] StoreError),

    /// The remote store returned an error status or no content address.
    #[error("upload rejected by remote store: {0}")]
    RemoteRejected(#[source] StoreError),

    /// Trial compression failed inside the codec.
    #[error("compression failed: {0}")]
    Codec(#[from] CodecError),
}

impl From<StoreError> for UploadError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unconfigured => UploadError::Unconfigured,
            StoreError::Transport(_) => UploadError::Transport(err),
            StoreError::Rejected { .. }
            | StoreError::MissingAddress
            | StoreError::NotFound { .. } => UploadError::RemoteRejected(err),
        }
    }
}

/// Failures of [`crate::RetrievalOrchestrator::download`].
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The remote store has no object under the address.
    #[error("object not found: {address}")]
    NotFound {
        /// The content address that was requested.
        address: String,
    },

    /// Network failure, timeout or error status while fetching.
    #[error("fetch of {address} failed: {source}")]
    Transport {
        /// The content address that was requested.
        address: String,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },

    /// Stored bytes do not match the recorded compression flag or size.
    #[error("stored object {address} is corrupt: {reason}")]
    CorruptPayload {
        /// The content address that was requested.
        address: String,
        /// What failed to match.
        reason: String,
    },

    /// Codec library failure unrelated to the stored bytes.
    #[error("decompression failed: {0}")]
    Codec(#[source] CodecError),
}

impl RetrievalError {
    pub(crate) fn from_store(address: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => RetrievalError::NotFound {
                address: address.to_string(),
            },
            other => RetrievalError::Transport {
                address: address.to_string(),
                source: other,
            },
        }
    }

    pub(crate) fn from_codec(address: &str, err: CodecError) -> Self {
        match err {
            CodecError::Malformed(reason) => RetrievalError::CorruptPayload {
                address: address.to_string(),
                reason,
            },
            internal => RetrievalError::Codec(internal),
        }
    }
}
