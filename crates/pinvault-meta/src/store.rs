//! Record stores.
//!
//! `MemoryRecordStore` keeps records in insertion order with secondary indices
//! on content address and uploader. `JsonRecordStore` layers persistence on top:
//! the whole record list is rewritten to a JSON file after every mutation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{MetaError, MetaResult};
use crate::record::{FileRecord, StoreStats};

/// Keyed record store consumed by the file service.
pub trait RecordStore: Send + Sync {
    /// Add a record. Fails if its id is already present.
    fn insert(&self, record: FileRecord) -> MetaResult<()>;

    /// Get a record by id.
    fn get(&self, id: &str) -> MetaResult<Option<FileRecord>>;

    /// First record stored under a content address.
    fn find_by_address(&self, address: &str) -> MetaResult<Option<FileRecord>>;

    /// Records created by one uploader, oldest first.
    fn list_by_uploader(&self, uploader: &str) -> MetaResult<Vec<FileRecord>>;

    /// All records, oldest first.
    fn list(&self) -> MetaResult<Vec<FileRecord>>;

    /// Remove a record. Returns false if it did not exist.
    fn delete(&self, id: &str) -> MetaResult<bool>;

    /// Aggregate statistics.
    fn stats(&self) -> MetaResult<StoreStats> {
        Ok(StoreStats::from_records(&self.list()?))
    }
}

#[derive(Default)]
struct Indexed {
    order: Vec<String>,
    by_id: HashMap<String, FileRecord>,
    by_address: HashMap<String, Vec<String>>,
    by_uploader: HashMap<String, Vec<String>>,
}

impl Indexed {
    fn insert(&mut self, record: FileRecord) -> MetaResult<()> {
        if self.by_id.contains_key(&record.id) {
            return Err(MetaError::DuplicateId(record.id));
        }
        let id = record.id.clone();
        self.order.push(id.clone());
        self.by_address
            .entry(record.content_address().to_string())
            .or_default()
            .push(id.clone());
        self.by_uploader
            .entry(record.uploader.clone())
            .or_default()
            .push(id.clone());
        self.by_id.insert(id, record);
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Option<FileRecord> {
        let record = self.by_id.remove(id)?;
        self.order.retain(|i| i != id);
        remove_from_index(&mut self.by_address, record.content_address(), id);
        remove_from_index(&mut self.by_uploader, &record.uploader, id);
        Some(record)
    }

    fn resolve(&self, ids: Option<&Vec<String>>) -> Vec<FileRecord> {
        ids.map(|ids| ids.iter().filter_map(|id| self.by_id.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    fn all(&self) -> Vec<FileRecord> {
        self.resolve(Some(&self.order))
    }
}

fn remove_from_index(index: &mut HashMap<String, Vec<String>>, key: &str, id: &str) {
    if let Some(ids) = index.get_mut(key) {
        ids.retain(|i| i != id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

/// In-memory record store. Does not survive restarts.
#[derive(Default)]
pub struct MemoryRecordStore {
    inner: RwLock<Indexed>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `records`, in order.
    pub fn from_records(records: Vec<FileRecord>) -> MetaResult<Self> {
        let store = Self::new();
        {
            let mut inner = store.inner.write();
            for record in records {
                inner.insert(record)?;
            }
        }
        Ok(store)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    /// True when there are no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: &str) -> Option<FileRecord> {
        self.inner.write().remove(id)
    }
}

impl RecordStore for MemoryRecordStore {
    fn insert(&self, record: FileRecord) -> MetaResult<()> {
        self.inner.write().insert(record)
    }

    fn get(&self, id: &str) -> MetaResult<Option<FileRecord>> {
        Ok(self.inner.read().by_id.get(id).cloned())
    }

    fn find_by_address(&self, address: &str) -> MetaResult<Option<FileRecord>> {
        let inner = self.inner.read();
        Ok(inner.resolve(inner.by_address.get(address)).into_iter().next())
    }

    fn list_by_uploader(&self, uploader: &str) -> MetaResult<Vec<FileRecord>> {
        let inner = self.inner.read();
        Ok(inner.resolve(inner.by_uploader.get(uploader)))
    }

    fn list(&self) -> MetaResult<Vec<FileRecord>> {
        Ok(self.inner.read().all())
    }

    fn delete(&self, id: &str) -> MetaResult<bool> {
        Ok(self.remove(id).is_some())
    }
}

/// Record store persisted as a pretty-printed JSON array.
pub struct JsonRecordStore {
    path: PathBuf,
    records: MemoryRecordStore,
    write_lock: Mutex<()>,
}

impl JsonRecordStore {
    /// Open the store at `path`, loading existing records. Parent directories are created.
    pub fn open(path: impl Into<PathBuf>) -> MetaResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let records = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let list: Vec<FileRecord> = if contents.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&contents)?
            };
            info!(count = list.len(), path = %path.display(), "Loaded file records");
            MemoryRecordStore::from_records(list)?
        } else {
            MemoryRecordStore::new()
        };
        Ok(Self {
            path,
            records,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // Write to a sibling temp file, then rename over the target.
    fn persist(&self, records: &[FileRecord]) -> MetaResult<()> {
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), count = records.len(), "Persisted file records");
        Ok(())
    }
}

// Mutations write the file first and touch memory only once it is on disk.
// `write_lock` spans both steps so the file and memory never diverge.
impl RecordStore for JsonRecordStore {
    fn insert(&self, record: FileRecord) -> MetaResult<()> {
        let _guard = self.write_lock.lock();
        if self.records.get(&record.id)?.is_some() {
            return Err(MetaError::DuplicateId(record.id));
        }
        let mut next = self.records.list()?;
        next.push(record.clone());
        self.persist(&next)?;
        self.records.insert(record)
    }

    fn get(&self, id: &str) -> MetaResult<Option<FileRecord>> {
        self.records.get(id)
    }

    fn find_by_address(&self, address: &str) -> MetaResult<Option<FileRecord>> {
        self.records.find_by_address(address)
    }

    fn list_by_uploader(&self, uploader: &str) -> MetaResult<Vec<FileRecord>> {
        self.records.list_by_uploader(uploader)
    }

    fn list(&self) -> MetaResult<Vec<FileRecord>> {
        self.records.list()
    }

    fn delete(&self, id: &str) -> MetaResult<bool> {
        let _guard = self.write_lock.lock();
        let mut next = self.records.list()?;
        let before = next.len();
        next.retain(|r| r.id != id);
        if next.len() == before {
            return Ok(false);
        }
        self.persist(&next)?;
        self.records.remove(id);
        info!(id, "File record deleted");
        Ok(true)
    }
}
