#![warn(missing_docs)]

//! PinVault metadata subsystem: upload records keyed by id and indexed by content address and uploader

pub mod error;
pub mod record;
pub mod store;

pub use error::{MetaError, MetaResult};
pub use record::{FileRecord, StoreStats};
pub use store::{JsonRecordStore, MemoryRecordStore, RecordStore};
