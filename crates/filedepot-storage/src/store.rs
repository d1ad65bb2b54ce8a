//! File lifecycle orchestration.
//!
//! The original-file side of the storage tree. Persistence of `StoredFile`
//! records belongs to an external layer; the calling service is expected to
//! orchestrate explicitly around it:
//!
//! 1. persist the record, then [`FileStore::save`] (or
//!    [`FileStore::save_from_temp`] for a finished upload);
//! 2. before overwriting a source's content, [`FileStore::replace`] flushes
//!    the source's derived artifacts first;
//! 3. on deletion, [`FileStore::remove`] flushes the derived artifacts and
//!    then deletes the original (an already-missing file is success).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use filedepot_core::{Bucket, StoredFile};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::derived_cache::DerivedCache;
use crate::error::{StorageError, StorageResult};
use crate::layout::{StorageLayout, UrlMode};

/// Stores, replaces and removes original files, keeping the derived-artifact
/// cache consistent around every mutation.
pub struct FileStore {
    layout: Arc<StorageLayout>,
    cache: Arc<DerivedCache>,
}

impl FileStore {
    pub fn new(layout: Arc<StorageLayout>, cache: Arc<DerivedCache>) -> Self {
        FileStore { layout, cache }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn cache(&self) -> &Arc<DerivedCache> {
        &self.cache
    }

    /// Absolute path of a persisted record's file.
    ///
    /// Fails with [`StorageError::NoFileBound`] for a record the persistence
    /// layer has not accepted yet.
    pub fn path_of(&self, record: &StoredFile) -> StorageResult<PathBuf> {
        let bucket = self.bound_bucket(record)?;
        Ok(self.layout.file_path(&bucket, &record.sys_name))
    }

    /// URL of a persisted record's file.
    pub fn url_of(&self, record: &StoredFile, mode: UrlMode<'_>) -> StorageResult<String> {
        let bucket = self.bound_bucket(record)?;
        Ok(self.layout.file_url(&bucket, &record.sys_name, mode))
    }

    /// Write a persisted record's bytes to its canonical path.
    ///
    /// Called right after the persistence layer accepted the record.
    pub async fn save(&self, record: &StoredFile, data: &[u8]) -> StorageResult<PathBuf> {
        let bucket = self.bound_bucket(record)?;
        self.layout.ensure_upload_dir(&bucket).await?;

        let path = self.layout.file_path(&bucket, &record.sys_name);
        write_file(&path, data).await?;

        tracing::info!(
            path = %path.display(),
            group = bucket.group_code(),
            size_bytes = data.len(),
            "stored file saved"
        );

        Ok(path)
    }

    /// Move a finished upload from its ingestion temp path to the record's
    /// canonical path.
    pub async fn save_from_temp(
        &self,
        record: &StoredFile,
        temp_path: &Path,
    ) -> StorageResult<PathBuf> {
        let bucket = self.bound_bucket(record)?;
        self.layout.ensure_upload_dir(&bucket).await?;

        let path = self.layout.file_path(&bucket, &record.sys_name);

        // Rename when possible; fall back to copy+remove across filesystems
        // (ingestion temp dirs often live on a different mount).
        if fs::rename(temp_path, &path).await.is_err() {
            fs::copy(temp_path, &path)
                .await
                .map_err(|source| StorageError::Write {
                    path: path.clone(),
                    source,
                })?;
            let _ = fs::remove_file(temp_path).await;
        }

        tracing::info!(
            path = %path.display(),
            from = %temp_path.display(),
            "uploaded file moved into storage"
        );

        Ok(path)
    }

    /// Overwrite a source file's content, invalidating its derived artifacts
    /// first so no stale artifact can be served against the new content.
    pub async fn replace(&self, record: &StoredFile, data: &[u8]) -> StorageResult<PathBuf> {
        let bucket = self.bound_bucket(record)?;
        self.cache.flush_source(&bucket, &record.sys_name).await?;
        self.save(record, data).await
    }

    /// Delete a source file and its derived artifacts.
    ///
    /// The cache is flushed first; a file already missing on disk is treated
    /// as success so deletion stays idempotent.
    pub async fn remove(&self, record: &StoredFile) -> StorageResult<()> {
        let bucket = self.bound_bucket(record)?;
        self.cache.flush_source(&bucket, &record.sys_name).await?;

        let path = self.layout.file_path(&bucket, &record.sys_name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "stored file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Delete { path, source }),
        }
    }

    fn bound_bucket(&self, record: &StoredFile) -> StorageResult<Bucket> {
        if !record.is_persisted() {
            return Err(StorageError::NoFileBound(record.name()));
        }
        Ok(record.bucket()?)
    }
}

async fn write_file(path: &Path, data: &[u8]) -> StorageResult<()> {
    let map = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut file = fs::File::create(path).await.map_err(map)?;
    file.write_all(data).await.map_err(map)?;
    file.sync_all().await.map_err(map)?;
    Ok(())
}
