//! Two-stage compression policy.
//!
//! Stage A rejects content types that are already entropy-dense containers
//! without touching the codec. Stage B runs a trial compression for everything
//! else and keeps the result only when it saves at least `min_ratio_percent`.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compression::{Codec, CompressionOutcome, ZstdCodec};
use crate::error::CodecError;

/// Content types that are already compressed containers.
///
/// `video/x-matroska` is not listed; Matroska files go through the trial compression.
pub const DEFAULT_SKIP_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "video/mp4",
    "video/mpeg",
    "video/webm",
    "audio/mp3",
    "audio/mpeg",
    "audio/ogg",
    "application/zip",
    "application/gzip",
    "application/x-gzip",
    "application/x-7z-compressed",
    "application/x-rar-compressed",
    "application/zstd",
];

/// Minimum saving, in percent, for a trial compression to be kept
pub const DEFAULT_MIN_RATIO_PERCENT: f64 = 10.0;

/// Policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Normalized content types that skip compression entirely
    pub skip_content_types: BTreeSet<String>,
    /// Trial compressions saving less than this are discarded
    pub min_ratio_percent: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            skip_content_types: DEFAULT_SKIP_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_ratio_percent: DEFAULT_MIN_RATIO_PERCENT,
        }
    }
}

/// Lower-case a content type and drop its parameters (`text/plain; charset=utf-8` → `text/plain`)
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Decides whether an upload is worth compressing
#[derive(Clone)]
pub struct CompressionPolicy {
    config: PolicyConfig,
    codec: Arc<dyn Codec>,
}

impl CompressionPolicy {
    /// Create a policy over the given codec
    pub fn new(config: PolicyConfig, codec: Arc<dyn Codec>) -> Self {
        let skip_content_types = config
            .skip_content_types
            .iter()
            .map(|ct| normalize_content_type(ct))
            .collect();
        Self {
            config: PolicyConfig {
                skip_content_types,
                ..config
            },
            codec,
        }
    }

    /// Default skip list and threshold over a default Zstd codec
    pub fn with_defaults() -> Self {
        Self::new(PolicyConfig::default(), Arc::new(ZstdCodec::default()))
    }

    /// Stage A: false when the content type is a known compressed container
    pub fn should_attempt(&self, content_type: &str) -> bool {
        !self
            .config
            .skip_content_types
            .contains(&normalize_content_type(content_type))
    }

    /// Stage B: true when a measured ratio clears the threshold
    pub fn accepts(&self, ratio_percent: f64) -> bool {
        ratio_percent >= self.config.min_ratio_percent
    }

    /// Run both stages.
    ///
    /// `None` means the bytes go out unmodified; `Some` carries the payload to send instead.
    pub fn evaluate(
        &self,
        data: &[u8],
        content_type: &str,
    ) -> Result<Option<CompressionOutcome>, CodecError> {
        if !self.should_attempt(content_type) {
            debug!(content_type, "skipping compression: already-compressed content type");
            return Ok(None);
        }

        let compressed = self.codec.compress(data)?;
        let outcome = CompressionOutcome::measure(data.len(), compressed);
        if !self.accepts(outcome.ratio_percent) {
            debug!(
                content_type,
                original = outcome.original_size,
                compressed = outcome.compressed_size,
                ratio = outcome.ratio_percent,
                "discarding trial compression below threshold"
            );
            return Ok(None);
        }

        debug!(
            content_type,
            codec = self.codec.name(),
            original = outcome.original_size,
            compressed = outcome.compressed_size,
            ratio = outcome.ratio_percent,
            "compression accepted"
        );
        Ok(Some(outcome))
    }

    /// The codec used for trial compressions
    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    /// Access policy configuration
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }
}

impl std::fmt::Debug for CompressionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionPolicy")
            .field("config", &self.config)
            .field("codec", &self.codec.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed-size output and counts calls.
    struct FixedCodec {
        output_len: usize,
        calls: AtomicUsize,
    }

    impl FixedCodec {
        fn new(output_len: usize) -> Arc<Self> {
            Arc::new(Self {
                output_len,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Codec for FixedCodec {
        fn compress(&self, _data: &[u8]) -> Result<Vec<u8>, CodecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0u8; self.output_len])
        }

        fn decompress(&self, _data: &[u8]) -> Result<Vec<u8>, CodecError> {
            Err(CodecError::Malformed("fixed codec cannot decompress".into()))
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn policy_with(codec: Arc<FixedCodec>) -> CompressionPolicy {
        CompressionPolicy::new(PolicyConfig::default(), codec)
    }

    #[test]
    fn skip_list_never_invokes_codec() {
        let codec = FixedCodec::new(1);
        let policy = policy_with(codec.clone());
        for ct in DEFAULT_SKIP_CONTENT_TYPES {
            assert!(policy.evaluate(&[7u8; 4096], ct).unwrap().is_none(), "{ct}");
        }
        assert_eq!(codec.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn skip_list_ignores_case_and_parameters() {
        let codec = FixedCodec::new(1);
        let policy = policy_with(codec.clone());
        assert!(!policy.should_attempt("IMAGE/JPEG"));
        assert!(!policy.should_attempt(" image/png ; foo=bar"));
        assert!(policy.evaluate(&[1u8; 100], "Image/Png").unwrap().is_none());
        assert_eq!(codec.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn matroska_goes_through_trial() {
        let codec = FixedCodec::new(10);
        let policy = policy_with(codec.clone());
        assert!(policy.should_attempt("video/x-matroska"));
        let outcome = policy.evaluate(&[0u8; 1000], "video/x-matroska").unwrap();
        assert!(outcome.is_some());
        assert_eq!(codec.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn just_below_threshold_is_rejected() {
        // 1000 → 901 bytes is a 9.9% saving
        let policy = policy_with(FixedCodec::new(901));
        assert!(policy.evaluate(&[0u8; 1000], "text/plain").unwrap().is_none());
    }

    #[test]
    fn just_above_threshold_is_accepted() {
        // 1000 → 899 bytes is a 10.1% saving
        let policy = policy_with(FixedCodec::new(899));
        let outcome = policy.evaluate(&[0u8; 1000], "text/plain").unwrap().unwrap();
        assert_eq!(outcome.original_size, 1000);
        assert_eq!(outcome.compressed_size, 899);
        assert!((outcome.ratio_percent - 10.1).abs() < 1e-9);
    }

    #[test]
    fn exact_threshold_is_accepted() {
        let policy = policy_with(FixedCodec::new(900));
        assert!(policy.evaluate(&[0u8; 1000], "text/plain").unwrap().is_some());
    }

    #[test]
    fn expanded_payload_is_rejected() {
        let policy = policy_with(FixedCodec::new(1500));
        assert!(policy.evaluate(&[0u8; 1000], "application/json").unwrap().is_none());
    }

    #[test]
    fn random_bytes_rejected_under_compressible_type() {
        let policy = CompressionPolicy::with_defaults();
        let mut data = vec![0u8; 64 * 1024];
        rand::rngs::StdRng::seed_from_u64(42).fill_bytes(&mut data);
        assert!(policy.should_attempt("text/plain"));
        assert!(policy.evaluate(&data, "text/plain").unwrap().is_none());
    }

    #[test]
    fn repetitive_text_accepted_with_zstd() {
        let policy = CompressionPolicy::with_defaults();
        let data = b"the quick brown fox jumps over the lazy dog\n".repeat(2000);
        let outcome = policy.evaluate(&data, "text/plain").unwrap().unwrap();
        assert!(outcome.ratio_percent > 10.0);
        assert_eq!(
            policy.codec().decompress(&outcome.compressed).unwrap(),
            data
        );
    }

    #[test]
    fn empty_input_is_never_compressed() {
        let policy = CompressionPolicy::with_defaults();
        assert!(policy.evaluate(&[], "text/plain").unwrap().is_none());
    }

    #[test]
    fn custom_skip_list_and_threshold() {
        let codec = FixedCodec::new(800);
        let config = PolicyConfig {
            skip_content_types: ["Text/CSV".to_string()].into_iter().collect(),
            min_ratio_percent: 25.0,
        };
        let policy = CompressionPolicy::new(config, codec.clone());
        assert!(!policy.should_attempt("text/csv"));
        assert!(policy.should_attempt("image/jpeg"));
        // 20% saving is below the raised threshold
        assert!(policy.evaluate(&[0u8; 1000], "image/jpeg").unwrap().is_none());
        assert_eq!(codec.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn config_from_partial_toml_keeps_defaults() {
        let config: PolicyConfig = toml::from_str("min_ratio_percent = 15.0").unwrap();
        assert_eq!(config.min_ratio_percent, 15.0);
        assert!(config.skip_content_types.contains("image/png"));
        assert!(!config.skip_content_types.contains("video/x-matroska"));
    }

    #[test]
    fn config_json_roundtrip() {
        let config = PolicyConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let decoded: PolicyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, decoded);
    }

    #[test]
    fn normalize_strips_parameters() {
        assert_eq!(normalize_content_type("Text/Plain; charset=UTF-8"), "text/plain");
        assert_eq!(normalize_content_type(""), "");
    }
}
