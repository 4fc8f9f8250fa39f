//! Error types for the pinvault-reduce subsystem

/// Errors raised by the codec
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Library or allocation failure while compressing or decompressing
    #[error("Codec internal failure: {0}")]
    Internal(String),
    /// Input handed to decompress is not valid compressed output (wrong format, truncated or corrupted)
    #[error("Malformed compressed input: {0}")]
    Malformed(String),
}

impl CodecError {
    /// True when the failure was caused by the input bytes rather than the codec itself
    pub fn is_malformed(&self) -> bool {
        matches!(self, CodecError::Malformed(_))
    }
}
