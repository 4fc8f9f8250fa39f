//! Upload orchestration: policy → codec → remote push → descriptor.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use pinvault_reduce::CompressionPolicy;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::backend::{ContentStore, StoreObject};
use crate::descriptor::{compressed_name, UploadDescriptor, COMPRESSED_CONTENT_TYPE};
use crate::error::UploadError;

/// Counters for the upload orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadStats {
    /// Successful uploads.
    pub uploads: u64,
    /// Successful uploads that shipped a compressed payload.
    pub compressed_uploads: u64,
    /// Bytes handed in by callers of successful uploads.
    pub bytes_in: u64,
    /// Bytes sent to the remote store by successful uploads.
    pub bytes_stored: u64,
    /// Failed uploads.
    pub failures: u64,
}

/// Runs the compression policy and pushes the result to a content store.
///
/// Holds no per-call state; concurrent uploads are independent.
pub struct UploadOrchestrator {
    policy: CompressionPolicy,
    store: Arc<dyn ContentStore>,
    stats: Mutex<UploadStats>,
}

impl UploadOrchestrator {
    /// Create an orchestrator.
    pub fn new(policy: CompressionPolicy, store: Arc<dyn ContentStore>) -> Self {
        Self {
            policy,
            store,
            stats: Mutex::new(UploadStats::default()),
        }
    }

    /// Upload one file.
    ///
    /// Compression is decided and applied before the push starts, so the push
    /// always carries a known length. Any failure returns an error and no descriptor.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn upload(
        &self,
        data: &[u8],
        name: &str,
        content_type: &str,
        compression_enabled: bool,
    ) -> Result<UploadDescriptor, UploadError> {
        let outcome = if compression_enabled {
            match self.policy.evaluate(data, content_type) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Trial compression failed: {}", e);
                    self.stats.lock().failures += 1;
                    return Err(e.into());
                }
            }
        } else {
            None
        };

        let (payload, stored_name, wire_content_type, compression) = match outcome {
            Some(outcome) => (
                Bytes::from(outcome.compressed),
                compressed_name(name),
                COMPRESSED_CONTENT_TYPE.to_string(),
                Some((outcome.original_size, outcome.ratio_percent)),
            ),
            None => (
                Bytes::copy_from_slice(data),
                name.to_string(),
                content_type.to_string(),
                None,
            ),
        };
        let stored_size = payload.len() as u64;

        let object = StoreObject::new(stored_name.clone(), wire_content_type, payload);
        let address = match self.store.put(object).await {
            Ok(address) => address,
            Err(e) => {
                warn!(backend = self.store.backend_name(), "Upload failed: {}", e);
                self.stats.lock().failures += 1;
                return Err(e.into());
            }
        };

        let descriptor = match compression {
            Some((original_size, ratio_percent)) => {
                info!(
                    %address,
                    original = original_size,
                    stored = stored_size,
                    ratio = format!("{:.2}", ratio_percent),
                    "File uploaded (compressed)"
                );
                UploadDescriptor::compressed(
                    address,
                    stored_name,
                    stored_size,
                    content_type.to_string(),
                    original_size,
                    ratio_percent,
                )
            }
            None => {
                info!(%address, stored = stored_size, "File uploaded");
                UploadDescriptor::plain(address, stored_name, stored_size, content_type.to_string())
            }
        };

        let mut stats = self.stats.lock();
        stats.uploads += 1;
        stats.bytes_in += data.len() as u64;
        stats.bytes_stored += stored_size;
        if descriptor.is_compressed {
            stats.compressed_uploads += 1;
        }
        Ok(descriptor)
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> UploadStats {
        self.stats.lock().clone()
    }

    /// The policy in use.
    pub fn policy(&self) -> &CompressionPolicy {
        &self.policy
    }

    /// The content store in use.
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }
}
