//! Content-addressed remote store interface.
//!
//! Backends hand back an opaque content address for every push. The in-memory
//! store below is used by tests and offline runs; [`crate::PinataStore`] talks
//! to an IPFS pinning service.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Boxed future type for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One object to push. The byte length is known before the transfer starts.
#[derive(Debug, Clone)]
pub struct StoreObject {
    /// Name the object is stored under.
    pub name: String,
    /// Content type declared to the remote store.
    pub content_type: String,
    /// Exact bytes to store.
    pub data: Bytes,
}

impl StoreObject {
    /// Build an object.
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Declared byte length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-length object.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Trait for content-addressed object stores (IPFS pinning services, test doubles).
pub trait ContentStore: Send + Sync {
    /// Push an object; resolves to its content address once the store acknowledges receipt.
    fn put(&self, object: StoreObject) -> BoxFuture<'_, StoreResult<String>>;

    /// Fetch the raw bytes stored under an address.
    fn get<'a>(&'a self, address: &'a str) -> BoxFuture<'a, StoreResult<Vec<u8>>>;

    /// Public URL for an address, when the backend exposes one.
    fn public_url(&self, _address: &str) -> Option<String> {
        None
    }

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Statistics for the in-memory store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStoreStats {
    /// Number of put calls, failed ones included.
    pub puts: u64,
    /// Number of get calls, failed ones included.
    pub gets: u64,
    /// Total bytes accepted.
    pub total_bytes_stored: u64,
}

/// An object held by [`MemoryContentStore`].
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// Name given at push time.
    pub name: String,
    /// Content type given at push time.
    pub content_type: String,
    /// Stored bytes.
    pub data: Bytes,
}

/// In-memory content store with failure injection.
pub struct MemoryContentStore {
    objects: Mutex<HashMap<String, StoredEntry>>,
    sequence: AtomicU64,
    stats: Mutex<MemoryStoreStats>,
    put_failure: Mutex<Option<StoreError>>,
    get_failure: Mutex<Option<StoreError>>,
}

impl MemoryContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(0),
            stats: Mutex::new(MemoryStoreStats::default()),
            put_failure: Mutex::new(None),
            get_failure: Mutex::new(None),
        }
    }

    /// Make the next `put` fail with `err`.
    pub fn fail_next_put(&self, err: StoreError) {
        *self.put_failure.lock() = Some(err);
    }

    /// Make the next `get` fail with `err`.
    pub fn fail_next_get(&self, err: StoreError) {
        *self.get_failure.lock() = Some(err);
    }

    /// Place bytes under an address directly, bypassing `put`.
    pub fn insert_raw(&self, address: impl Into<String>, data: impl Into<Bytes>) {
        let entry = StoredEntry {
            name: String::new(),
            content_type: "application/octet-stream".to_string(),
            data: data.into(),
        };
        self.objects.lock().insert(address.into(), entry);
    }

    /// Look at a stored object.
    pub fn object(&self, address: &str) -> Option<StoredEntry> {
        self.objects.lock().get(address).cloned()
    }

    /// Number of stored objects.
    pub fn stored_count(&self) -> usize {
        self.objects.lock().len()
    }

    /// Get statistics about store operations.
    pub fn stats(&self) -> MemoryStoreStats {
        self.stats.lock().clone()
    }

    // Every push gets its own address, identical payloads included.
    fn next_address(&self, data: &[u8]) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut hasher = blake3::Hasher::new();
        hasher.update(&seq.to_le_bytes());
        hasher.update(data);
        format!("bafkmem{}", &hasher.finalize().to_hex()[..40])
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for MemoryContentStore {
    fn put(&self, object: StoreObject) -> BoxFuture<'_, StoreResult<String>> {
        self.stats.lock().puts += 1;
        let injected = self.put_failure.lock().take();

        Box::pin(async move {
            if let Some(err) = injected {
                debug!(name = %object.name, "Mock put failing: {}", err);
                return Err(err);
            }
            let address = self.next_address(&object.data);
            let bytes = object.len() as u64;
            self.objects.lock().insert(
                address.clone(),
                StoredEntry {
                    name: object.name,
                    content_type: object.content_type,
                    data: object.data,
                },
            );
            let mut stats = self.stats.lock();
            stats.total_bytes_stored = stats.total_bytes_stored.saturating_add(bytes);
            debug!(%address, bytes, "Mock put");
            Ok(address)
        })
    }

    fn get<'a>(&'a self, address: &'a str) -> BoxFuture<'a, StoreResult<Vec<u8>>> {
        self.stats.lock().gets += 1;
        let injected = self.get_failure.lock().take();
        let found = self.objects.lock().get(address).map(|e| e.data.to_vec());

        Box::pin(async move {
            if let Some(err) = injected {
                return Err(err);
            }
            debug!(address, found = found.is_some(), "Mock get");
            found.ok_or_else(|| StoreError::NotFound {
                address: address.to_string(),
            })
        })
    }

    fn public_url(&self, address: &str) -> Option<String> {
        Some(format!("memory://{}", address))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(data: &'static [u8]) -> StoreObject {
        StoreObject::new("a.txt", "text/plain", Bytes::from_static(data))
    }

    #[tokio::test]
    async fn test_memory_store_put_get() {
        let store = MemoryContentStore::new();
        let address = store.put(object(b"hello")).await.unwrap();
        assert_eq!(store.get(&address).await.unwrap(), b"hello");

        let entry = store.object(&address).unwrap();
        assert_eq!(entry.name, "a.txt");
        assert_eq!(entry.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_identical_payloads_get_distinct_addresses() {
        let store = MemoryContentStore::new();
        let a = store.put(object(b"same")).await.unwrap();
        let b = store.put(object(b"same")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.stored_count(), 2);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = MemoryContentStore::new();
        let err = store.get("bafkmissing").await.unwrap_err();
        assert_eq!(
            err,
            StoreError::NotFound {
                address: "bafkmissing".into()
            }
        );
    }

    #[tokio::test]
    async fn test_put_failure_injection_is_one_shot() {
        let store = MemoryContentStore::new();
        store.fail_next_put(StoreError::Transport("connection reset".into()));

        assert!(store.put(object(b"x")).await.is_err());
        assert_eq!(store.stored_count(), 0);
        assert!(store.put(object(b"x")).await.is_ok());
        assert_eq!(store.stats().puts, 2);
    }

    #[tokio::test]
    async fn test_get_failure_injection() {
        let store = MemoryContentStore::new();
        let address = store.put(object(b"y")).await.unwrap();
        store.fail_next_get(StoreError::Transport("timeout".into()));
        assert!(store.get(&address).await.is_err());
        assert_eq!(store.get(&address).await.unwrap(), b"y");
    }

    #[tokio::test]
    async fn test_insert_raw() {
        let store = MemoryContentStore::new();
        store.insert_raw("bafkraw", b"raw bytes".to_vec());
        assert_eq!(store.get("bafkraw").await.unwrap(), b"raw bytes");
    }

    #[tokio::test]
    async fn test_stats_track_bytes() {
        let store = MemoryContentStore::new();
        store.put(object(b"12345")).await.unwrap();
        assert_eq!(store.stats().total_bytes_stored, 5);
    }
}
