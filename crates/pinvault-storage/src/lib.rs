#![warn(missing_docs)]

//! PinVault storage subsystem: content-addressed remote store, upload and retrieval orchestration
//!
//! Upload path:   Data → CompressionPolicy → (Codec) → ContentStore::put → UploadDescriptor
//! Retrieval path: ContentStore::get → (Codec inverse, iff descriptor.is_compressed) → Data

pub mod backend;
pub mod descriptor;
pub mod error;
pub mod pinata;
pub mod retrieve;
pub mod upload;

pub use backend::{BoxFuture, ContentStore, MemoryContentStore, MemoryStoreStats, StoreObject};
pub use descriptor::{UploadDescriptor, COMPRESSED_CONTENT_TYPE, COMPRESSED_SUFFIX};
pub use error::{RetrievalError, StoreError, StoreResult, UploadError};
pub use pinata::{alternative_gateways, GatewayLinks, PinataStore, RemoteStoreConfig};
pub use retrieve::{RetrievalOrchestrator, RetrievalStats};
pub use upload::{UploadOrchestrator, UploadStats};
