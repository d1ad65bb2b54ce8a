//! Stored-file record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bucket::{Bucket, BucketError};

/// One stored original file.
///
/// The record is persisted by an external persistence layer; this crate only
/// reads its fields. `sys_name` is generated on upload and unique across the
/// whole storage namespace — it is the anchor every derived-artifact cache
/// entry is keyed and invalidated by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    /// Persistence identifier. `None` until the external persistence layer
    /// has accepted the record; path and URL resolution refuse records that
    /// have not been persisted yet.
    pub id: Option<i64>,
    pub group_code: String,
    pub object_id: Option<String>,
    /// Generated unique on-disk filename, extension included.
    pub sys_name: String,
    pub original_name: String,
    pub original_extension: String,
    pub mime: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredFile {
    /// Original filename with its extension, as uploaded.
    pub fn name(&self) -> String {
        format!("{}.{}", self.original_name, self.original_extension)
    }

    /// The bucket this file lives in.
    pub fn bucket(&self) -> Result<Bucket, BucketError> {
        Bucket::new(self.group_code.clone(), self.object_id.clone())
    }

    /// Whether the record has been persisted and may have a file on disk.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}
