//! Upload descriptor: the durable summary of one upload.

use serde::{Deserialize, Serialize};

/// Suffix appended to the stored name of compressed payloads. A display hint only.
pub const COMPRESSED_SUFFIX: &str = ".zst";

/// Content type declared to the remote store for compressed payloads.
pub const COMPRESSED_CONTENT_TYPE: &str = "application/zstd";

/// Outcome of an upload, immutable once the remote store acknowledged it.
///
/// `is_compressed` is the only input that decides whether retrieval decompresses;
/// it is never derived from `stored_name` or `content_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDescriptor {
    /// Address returned by the remote store.
    pub content_address: String,
    /// Name the bytes were stored under.
    pub stored_name: String,
    /// Length of the bytes actually sent.
    pub stored_size: u64,
    /// Content type declared by the uploader.
    pub content_type: String,
    /// Whether the stored bytes are codec output.
    pub is_compressed: bool,
    /// Length of the uploader's bytes; set only when compressed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_size: Option<u64>,
    /// Percentage saved; set only when compressed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio_percent: Option<f64>,
}

impl UploadDescriptor {
    /// Descriptor for bytes stored unmodified.
    pub fn plain(
        content_address: String,
        stored_name: String,
        stored_size: u64,
        content_type: String,
    ) -> Self {
        Self {
            content_address,
            stored_name,
            stored_size,
            content_type,
            is_compressed: false,
            original_size: None,
            ratio_percent: None,
        }
    }

    /// Descriptor for a compressed payload.
    pub fn compressed(
        content_address: String,
        stored_name: String,
        stored_size: u64,
        content_type: String,
        original_size: u64,
        ratio_percent: f64,
    ) -> Self {
        Self {
            content_address,
            stored_name,
            stored_size,
            content_type,
            is_compressed: true,
            original_size: Some(original_size),
            ratio_percent: Some(ratio_percent),
        }
    }

    /// Name to show to users: the stored name minus exactly the compression suffix.
    pub fn display_name(&self) -> &str {
        if self.is_compressed {
            self.stored_name
                .strip_suffix(COMPRESSED_SUFFIX)
                .unwrap_or(&self.stored_name)
        } else {
            &self.stored_name
        }
    }

    /// Length of the bytes a download reconstructs.
    pub fn original_len(&self) -> u64 {
        self.original_size.unwrap_or(self.stored_size)
    }
}

/// Stored name for a compressed payload.
pub fn compressed_name(name: &str) -> String {
    format!("{}{}", name, COMPRESSED_SUFFIX)
}
