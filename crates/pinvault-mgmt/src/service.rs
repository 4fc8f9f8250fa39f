//! File service: ties the upload/retrieval pipeline to the record store.
//!
//! Ingest is upload first, then record. A failed upload leaves no record. An
//! upload whose record cannot be written is reported as [`ServiceError::Unlinked`]
//! with the content address, since the remote object is already pinned.

use std::sync::Arc;

use pinvault_meta::{FileRecord, MetaError, RecordStore, StoreStats};
use pinvault_reduce::CompressionPolicy;
use pinvault_storage::{
    ContentStore, RetrievalError, RetrievalOrchestrator, RetrievalStats, UploadError,
    UploadOrchestrator, UploadStats,
};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Errors surfaced by [`FileService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The upload pipeline failed; nothing was recorded.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The object could not be fetched or reconstructed.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// Record store failure.
    #[error(transparent)]
    Meta(#[from] MetaError),

    /// No record for the given content address or id.
    #[error("no file record for {0}")]
    NotFound(String),

    /// Upload succeeded but its record could not be written.
    #[error("uploaded {content_address} but failed to record it: {source}")]
    Unlinked {
        /// Address of the orphaned remote object.
        content_address: String,
        /// Record store failure.
        #[source]
        source: MetaError,
    },
}

impl ServiceError {
    /// Short message suitable for end users.
    pub fn user_message(&self) -> &'static str {
        match self {
            ServiceError::Upload(UploadError::Unconfigured) => "Storage is not configured.",
            ServiceError::Upload(_) => "Upload failed. Please try again.",
            ServiceError::Retrieval(RetrievalError::NotFound { .. })
            | ServiceError::NotFound(_) => "File not found.",
            ServiceError::Retrieval(_) => "Failed to retrieve the file.",
            ServiceError::Meta(_) => "File records are unavailable. Please try again later.",
            ServiceError::Unlinked { .. } => {
                "Upload stored but could not be saved. Please contact support."
            }
        }
    }
}

/// How a served file should be presented by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Display in place.
    Inline,
    /// Save as a download.
    Attachment,
}

/// A reconstructed file ready to hand back to a client.
#[derive(Debug, Clone)]
pub struct ServedFile {
    /// Original bytes.
    pub bytes: Vec<u8>,
    /// Name the uploader supplied.
    pub file_name: String,
    /// Declared content type.
    pub content_type: String,
    /// Requested presentation.
    pub disposition: Disposition,
}

impl ServedFile {
    /// `Content-Disposition` header value.
    pub fn content_disposition(&self) -> String {
        let kind = match self.disposition {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        };
        format!("{}; filename=\"{}\"", kind, self.file_name.replace('"', "'"))
    }

    /// `Cache-Control` header value. Content addresses are immutable.
    pub fn cache_control(&self) -> &'static str {
        match self.disposition {
            Disposition::Inline => "public, max-age=31536000",
            Disposition::Attachment => "no-cache",
        }
    }
}

/// One file to ingest.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// File contents.
    pub data: Vec<u8>,
    /// File name as supplied by the uploader.
    pub name: String,
    /// Declared content type.
    pub content_type: String,
    /// Uploader identity.
    pub uploader: String,
    /// Uploader display name.
    pub user_name: Option<String>,
    /// Whether to run the compression policy.
    pub compression_enabled: bool,
}

impl IngestRequest {
    /// New request with compression enabled and no display name.
    pub fn new(
        data: Vec<u8>,
        name: impl Into<String>,
        content_type: impl Into<String>,
        uploader: impl Into<String>,
    ) -> Self {
        Self {
            data,
            name: name.into(),
            content_type: content_type.into(),
            uploader: uploader.into(),
            user_name: None,
            compression_enabled: true,
        }
    }

    /// Set the uploader display name.
    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    /// Enable or disable compression.
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression_enabled = enabled;
        self
    }
}

/// Upload, serve and catalogue files.
pub struct FileService {
    uploads: UploadOrchestrator,
    retrieval: RetrievalOrchestrator,
    records: Arc<dyn RecordStore>,
}

impl FileService {
    /// Build a service; retrieval decompresses with the policy's codec.
    pub fn new(
        policy: CompressionPolicy,
        store: Arc<dyn ContentStore>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        let retrieval = RetrievalOrchestrator::new(policy.codec().clone(), store.clone());
        Self {
            uploads: UploadOrchestrator::new(policy, store),
            retrieval,
            records,
        }
    }

    /// Upload a file and record it.
    #[instrument(skip(self, request), fields(name = %request.name, uploader = %request.uploader))]
    pub async fn ingest(&self, request: IngestRequest) -> Result<FileRecord, ServiceError> {
        let descriptor = self
            .uploads
            .upload(
                &request.data,
                &request.name,
                &request.content_type,
                request.compression_enabled,
            )
            .await?;

        let gateway_url = self.uploads.store().public_url(&descriptor.content_address);
        let record = FileRecord::new(descriptor, request.uploader, request.user_name, gateway_url);

        if let Err(source) = self.records.insert(record.clone()) {
            let content_address = record.content_address().to_string();
            warn!(%content_address, "Uploaded object has no record: {}", source);
            return Err(ServiceError::Unlinked {
                content_address,
                source,
            });
        }
        info!(id = %record.id, address = %record.content_address(), "File recorded");
        Ok(record)
    }

    /// Fetch the file stored under `content_address`.
    pub async fn open(
        &self,
        content_address: &str,
        disposition: Disposition,
    ) -> Result<ServedFile, ServiceError> {
        let record = self
            .records
            .find_by_address(content_address)?
            .ok_or_else(|| ServiceError::NotFound(content_address.to_string()))?;
        let bytes = self.retrieval.fetch(&record.descriptor).await?;
        Ok(ServedFile {
            bytes,
            file_name: record.descriptor.display_name().to_string(),
            content_type: record.descriptor.content_type.clone(),
            disposition,
        })
    }

    /// Record by id.
    pub fn get(&self, id: &str) -> Result<Option<FileRecord>, ServiceError> {
        Ok(self.records.get(id)?)
    }

    /// Record by content address.
    pub fn find_by_address(&self, address: &str) -> Result<Option<FileRecord>, ServiceError> {
        Ok(self.records.find_by_address(address)?)
    }

    /// All records.
    pub fn list(&self) -> Result<Vec<FileRecord>, ServiceError> {
        Ok(self.records.list()?)
    }

    /// Records of one uploader.
    pub fn list_by_uploader(&self, uploader: &str) -> Result<Vec<FileRecord>, ServiceError> {
        Ok(self.records.list_by_uploader(uploader)?)
    }

    /// Remove a record. The remote object stays pinned.
    pub fn delete(&self, id: &str) -> Result<bool, ServiceError> {
        Ok(self.records.delete(id)?)
    }

    /// Aggregate record statistics.
    pub fn stats(&self) -> Result<StoreStats, ServiceError> {
        Ok(self.records.stats()?)
    }

    /// Upload pipeline counters.
    pub fn upload_stats(&self) -> UploadStats {
        self.uploads.stats()
    }

    /// Retrieval pipeline counters.
    pub fn retrieval_stats(&self) -> RetrievalStats {
        self.retrieval.stats()
    }
}
