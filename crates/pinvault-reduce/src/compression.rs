//! Zstd compression/decompression for the upload pipeline

use crate::error::CodecError;
use serde::{Deserialize, Serialize};

/// Stateless compress/decompress pair.
///
/// Implementations must be pure: no shared mutable state, safe to call
/// concurrently with disjoint inputs. `decompress(compress(b)) == b` for every `b`.
pub trait Codec: Send + Sync {
    /// Compress a buffer. Fails only on library/allocation failure, never on input content.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Reverse `compress`. Fails with [`CodecError::Malformed`] on input that is not valid compressed output.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Short algorithm name for logs
    fn name(&self) -> &'static str;
}

/// Zstandard codec, the single general-purpose algorithm used for uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZstdCodec {
    /// Compression level (1=fastest, 19=best ratio, 3=balanced default)
    pub level: i32,
}

impl ZstdCodec {
    /// Default compression level
    pub const DEFAULT_LEVEL: i32 = 3;

    /// Create a codec at the given level
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEVEL)
    }
}

impl Codec for ZstdCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::encode_all(data, self.level).map_err(|e| CodecError::Internal(e.to_string()))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::decode_all(data).map_err(|e| CodecError::Malformed(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "zstd"
    }
}

/// Result of one trial compression. Ephemeral, never persisted on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionOutcome {
    /// Compressed payload
    pub compressed: Vec<u8>,
    /// Length of the input
    pub original_size: u64,
    /// Length of `compressed`; may exceed `original_size` for incompressible input
    pub compressed_size: u64,
    /// `(original - compressed) / original * 100`, negative when the payload grew
    pub ratio_percent: f64,
}

impl CompressionOutcome {
    /// Measure a compressed buffer against the length of its input
    pub fn measure(original_len: usize, compressed: Vec<u8>) -> Self {
        let original_size = original_len as u64;
        let compressed_size = compressed.len() as u64;
        Self {
            compressed,
            original_size,
            compressed_size,
            ratio_percent: ratio_percent(original_size, compressed_size),
        }
    }

    /// Bytes saved; negative when compression expanded the payload
    pub fn bytes_saved(&self) -> i64 {
        self.original_size as i64 - self.compressed_size as i64
    }
}

/// Percentage saved. Empty input has no meaningful ratio and reports 0.
pub fn ratio_percent(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{RngCore, SeedableRng};

    proptest! {
        #[test]
        fn prop_zstd_roundtrip(data in prop::collection::vec(0u8..=255, 0..100_000)) {
            let codec = ZstdCodec::default();
            let c = codec.compress(&data).unwrap();
            let d = codec.decompress(&c).unwrap();
            prop_assert_eq!(d, data);
        }

        #[test]
        fn prop_roundtrip_any_level(
            level in 1i32..=9,
            data in prop::collection::vec(0u8..=255, 0..4096),
        ) {
            let codec = ZstdCodec::new(level);
            let d = codec.decompress(&codec.compress(&data).unwrap()).unwrap();
            prop_assert_eq!(d, data);
        }
    }

    #[test]
    fn empty_roundtrips() {
        let codec = ZstdCodec::default();
        let c = codec.compress(&[]).unwrap();
        assert!(!c.is_empty());
        assert_eq!(codec.decompress(&c).unwrap(), b"");
    }

    #[test]
    fn large_mixed_roundtrip() {
        let codec = ZstdCodec::default();
        let mut data = b"pinvault large payload line\n".repeat(300_000);
        let mut noise = vec![0u8; 2 * 1024 * 1024];
        rand::rngs::StdRng::seed_from_u64(11).fill_bytes(&mut noise);
        data.extend_from_slice(&noise);
        assert!(data.len() > 10 * 1024 * 1024);

        let c = codec.compress(&data).unwrap();
        assert!(c.len() < data.len());
        assert_eq!(codec.decompress(&c).unwrap(), data);
    }

    #[test]
    fn already_compressed_input_accepted() {
        let codec = ZstdCodec::default();
        let once = codec.compress(&b"abc".repeat(1000)).unwrap();
        let twice = codec.compress(&once).unwrap();
        let restored = codec.decompress(&codec.decompress(&twice).unwrap()).unwrap();
        assert_eq!(restored, b"abc".repeat(1000));
    }

    #[test]
    fn plain_bytes_are_malformed() {
        let codec = ZstdCodec::default();
        let err = codec.decompress(b"this was never compressed").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn outcome_measures_ratio() {
        let outcome = CompressionOutcome::measure(1000, vec![0u8; 250]);
        assert_eq!(outcome.original_size, 1000);
        assert_eq!(outcome.compressed_size, 250);
        assert!((outcome.ratio_percent - 75.0).abs() < f64::EPSILON);
        assert_eq!(outcome.bytes_saved(), 750);
    }

    #[test]
    fn outcome_ratio_can_be_negative() {
        let outcome = CompressionOutcome::measure(100, vec![0u8; 120]);
        assert!((outcome.ratio_percent + 20.0).abs() < 1e-9);
        assert_eq!(outcome.bytes_saved(), -20);
    }

    #[test]
    fn empty_input_ratio_is_zero() {
        assert_eq!(ratio_percent(0, 9), 0.0);
    }
}
