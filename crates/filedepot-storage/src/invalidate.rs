//! Cache invalidation.
//!
//! Two eviction granularities, both invoked by the surrounding lifecycle
//! (before a source update, around a source deletion):
//!
//! - bulk: drop a bucket's whole cache subtree;
//! - selective: drop only the artifacts derived from one source file,
//!   matched by the `_{sys_name}` suffix of the cache naming scheme.
//!
//! Failures are reported, never escalated: a failed flush leaves stale
//! artifacts behind and the caller may retry. A missing cache directory
//! means there is nothing to flush and counts as success.

use filedepot_core::Bucket;
use tokio::fs;

use crate::derived_cache::DerivedCache;
use crate::error::{StorageError, StorageResult};

impl DerivedCache {
    /// Remove every derived artifact in the bucket, unconditionally.
    ///
    /// On a deletion error the directory may be left partially removed.
    pub async fn flush_bucket(&self, bucket: &Bucket) -> StorageResult<()> {
        let dir = self.layout().cache_dir(bucket);

        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::info!(
                    path = %dir.display(),
                    group = bucket.group_code(),
                    "bucket cache flushed"
                );
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Flush { path: dir, source }),
        }
    }

    /// Remove the derived artifacts of one source file, leaving every other
    /// source's artifacts in the bucket untouched. Returns how many entries
    /// were deleted.
    ///
    /// The scan is non-recursive and the `_{sys_name}` suffix comparison is
    /// case-insensitive. Best-effort: the first deletion error aborts the
    /// scan and is returned; entries already deleted stay deleted.
    pub async fn flush_source(&self, bucket: &Bucket, sys_name: &str) -> StorageResult<usize> {
        let dir = self.layout().cache_dir(bucket);
        let suffix = format!("_{}", sys_name.to_lowercase());

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => return Err(StorageError::Flush { path: dir, source }),
        };

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => return Err(StorageError::Flush { path: dir, source }),
            };

            let name = entry.file_name().to_string_lossy().to_lowercase();
            if !name.ends_with(&suffix) {
                continue;
            }
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }

            let path = entry.path();
            fs::remove_file(&path)
                .await
                .map_err(|source| StorageError::Flush {
                    path: path.clone(),
                    source,
                })?;
            removed += 1;
        }

        tracing::debug!(
            path = %dir.display(),
            sys_name,
            removed,
            "source cache flushed"
        );

        Ok(removed)
    }
}
