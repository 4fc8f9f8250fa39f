//! Retrieval orchestration: fetch, then reverse compression when the descriptor says so.

use std::sync::Arc;

use parking_lot::Mutex;
use pinvault_reduce::Codec;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::backend::ContentStore;
use crate::descriptor::UploadDescriptor;
use crate::error::RetrievalError;

/// Counters for the retrieval orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalStats {
    /// Successful downloads.
    pub downloads: u64,
    /// Successful downloads that were decompressed.
    pub decompressed: u64,
    /// Bytes fetched from the remote store.
    pub bytes_fetched: u64,
    /// Bytes returned to callers.
    pub bytes_returned: u64,
    /// Failed downloads, corrupt payloads included.
    pub failures: u64,
}

/// Fetches stored objects and reconstructs the uploader's bytes.
///
/// No retries here; callers classify failures and back off themselves.
pub struct RetrievalOrchestrator {
    codec: Arc<dyn Codec>,
    store: Arc<dyn ContentStore>,
    stats: Mutex<RetrievalStats>,
}

impl RetrievalOrchestrator {
    /// Create an orchestrator. `codec` must be the one uploads were compressed with.
    pub fn new(codec: Arc<dyn Codec>, store: Arc<dyn ContentStore>) -> Self {
        Self {
            codec,
            store,
            stats: Mutex::new(RetrievalStats::default()),
        }
    }

    /// Fetch `address` and decompress iff `is_compressed`.
    #[instrument(skip(self))]
    pub async fn download(
        &self,
        address: &str,
        is_compressed: bool,
    ) -> Result<Vec<u8>, RetrievalError> {
        let (data, fetched_len) = self.restore(address, is_compressed).await?;
        self.record_success(fetched_len, data.len() as u64, is_compressed);
        Ok(data)
    }

    /// Download through a descriptor and check the reconstructed length against it.
    pub async fn fetch(&self, descriptor: &UploadDescriptor) -> Result<Vec<u8>, RetrievalError> {
        let (data, fetched_len) = self
            .restore(&descriptor.content_address, descriptor.is_compressed)
            .await?;
        let expected = descriptor.original_len();
        if data.len() as u64 != expected {
            warn!(expected, restored = data.len(), "Reconstructed size does not match descriptor");
            self.stats.lock().failures += 1;
            return Err(RetrievalError::CorruptPayload {
                address: descriptor.content_address.clone(),
                reason: format!("expected {} bytes, reconstructed {}", expected, data.len()),
            });
        }
        self.record_success(fetched_len, data.len() as u64, descriptor.is_compressed);
        Ok(data)
    }

    // Failures are counted here; successes by the caller once it accepts the bytes.
    async fn restore(
        &self,
        address: &str,
        is_compressed: bool,
    ) -> Result<(Vec<u8>, u64), RetrievalError> {
        let fetched = match self.store.get(address).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(backend = self.store.backend_name(), "Fetch failed: {}", e);
                self.stats.lock().failures += 1;
                return Err(RetrievalError::from_store(address, e));
            }
        };
        let fetched_len = fetched.len() as u64;
        if !is_compressed {
            return Ok((fetched, fetched_len));
        }

        match self.codec.decompress(&fetched) {
            Ok(data) => {
                debug!(fetched = fetched_len, restored = data.len(), "Decompressed payload");
                Ok((data, fetched_len))
            }
            Err(e) => {
                warn!("Stored object does not match its compression flag: {}", e);
                self.stats.lock().failures += 1;
                Err(RetrievalError::from_codec(address, e))
            }
        }
    }

    fn record_success(&self, fetched: u64, returned: u64, decompressed: bool) {
        let mut stats = self.stats.lock();
        stats.downloads += 1;
        stats.bytes_fetched += fetched;
        stats.bytes_returned += returned;
        if decompressed {
            stats.decompressed += 1;
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> RetrievalStats {
        self.stats.lock().clone()
    }
}
