//! File records and aggregate statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pinvault_storage::UploadDescriptor;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted metadata for one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Record id (UUID v4).
    pub id: String,
    /// Identity token of the uploading party.
    pub uploader: String,
    /// Display name of the uploader, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// When the record was created.
    pub uploaded_at: DateTime<Utc>,
    /// Public URL of the stored object, when the backend has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
    /// Upload outcome.
    #[serde(flatten)]
    pub descriptor: UploadDescriptor,
}

impl FileRecord {
    /// New record with a fresh id, stamped now.
    pub fn new(
        descriptor: UploadDescriptor,
        uploader: impl Into<String>,
        user_name: Option<String>,
        gateway_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            uploader: uploader.into(),
            user_name,
            uploaded_at: Utc::now(),
            gateway_url,
            descriptor,
        }
    }

    /// Content address of the stored object.
    pub fn content_address(&self) -> &str {
        &self.descriptor.content_address
    }

    /// Major type of the declared content type (`image/png` → `image`).
    pub fn category(&self) -> &str {
        self.descriptor
            .content_type
            .split('/')
            .next()
            .unwrap_or_default()
    }
}

/// Aggregate statistics over all records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Number of records.
    pub total_files: usize,
    /// Sum of stored sizes.
    pub total_stored_bytes: u64,
    /// Sum of reconstructed sizes.
    pub total_original_bytes: u64,
    /// Records whose payload is compressed.
    pub compressed_files: usize,
    /// Record count per content-type category.
    pub by_category: BTreeMap<String, usize>,
}

impl StoreStats {
    /// Aggregate a set of records.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a FileRecord>) -> Self {
        let mut stats = StoreStats::default();
        for record in records {
            stats.total_files += 1;
            stats.total_stored_bytes += record.descriptor.stored_size;
            stats.total_original_bytes += record.descriptor.original_len();
            if record.descriptor.is_compressed {
                stats.compressed_files += 1;
            }
            *stats
                .by_category
                .entry(record.category().to_string())
                .or_insert(0) += 1;
        }
        stats
    }

    /// Bytes saved across all compressed records.
    pub fn bytes_saved(&self) -> u64 {
        self.total_original_bytes.saturating_sub(self.total_stored_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(cid: &str, ct: &str, size: u64) -> UploadDescriptor {
        UploadDescriptor::plain(cid.into(), "f".into(), size, ct.into())
    }

    #[test]
    fn test_new_record_has_unique_id() {
        let a = FileRecord::new(plain("c1", "text/plain", 1), "42", None, None);
        let b = FileRecord::new(plain("c1", "text/plain", 1), "42", None, None);
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_category() {
        let r = FileRecord::new(plain("c", "image/png", 1), "u", None, None);
        assert_eq!(r.category(), "image");
    }

    #[test]
    fn test_json_is_flat() {
        let r = FileRecord::new(plain("bafy1", "text/plain", 9), "u1", Some("alice".into()), None);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["contentAddress"], "bafy1");
        assert_eq!(json["uploader"], "u1");
        assert_eq!(json["userName"], "alice");
        assert!(json.get("descriptor").is_none());

        let back: FileRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_stats_from_records() {
        let records = vec![
            FileRecord::new(plain("a", "image/jpeg", 100), "u", None, None),
            FileRecord::new(
                UploadDescriptor::compressed(
                    "b".into(),
                    "t.zst".into(),
                    20,
                    "text/plain".into(),
                    200,
                    90.0,
                ),
                "u",
                None,
                None,
            ),
            FileRecord::new(plain("c", "image/png", 50), "v", None, None),
        ];
        let stats = StoreStats::from_records(&records);
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_stored_bytes, 170);
        assert_eq!(stats.total_original_bytes, 350);
        assert_eq!(stats.compressed_files, 1);
        assert_eq!(stats.by_category["image"], 2);
        assert_eq!(stats.by_category["text"], 1);
        assert_eq!(stats.bytes_saved(), 180);
    }
}
