//! The derived-artifact cache.
//!
//! Compute-if-absent over the cache directory of a bucket. Existence of the
//! artifact at its canonical path is the only cache-hit state: hits never
//! re-invoke the producer and never re-read or validate content. Artifacts
//! are immutable per key once written; they change only through explicit
//! invalidation (see `invalidate`).
//!
//! Generation is serialized per canonical path, and producers write to a
//! temp file in the cache directory that is renamed into place on success,
//! so concurrent readers can never observe a partially written artifact.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filedepot_core::Bucket;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cache_key::CacheKey;
use crate::error::{StorageError, StorageResult};
use crate::layout::{StorageLayout, UrlMode};

/// Reference to one derived artifact on disk.
#[derive(Debug, Clone)]
pub struct CachedArtifact {
    pub bucket: Bucket,
    pub file_name: String,
    pub path: PathBuf,
}

/// Lazy, disk-backed cache of derived artifacts.
pub struct DerivedCache {
    layout: Arc<StorageLayout>,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DerivedCache {
    pub fn new(layout: Arc<StorageLayout>) -> Self {
        DerivedCache {
            layout,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Canonical path of the artifact for a key.
    pub fn artifact_path(&self, bucket: &Bucket, key: &CacheKey) -> PathBuf {
        self.layout.cache_file_path(bucket, &key.file_name())
    }

    /// URL of an artifact previously returned by [`DerivedCache::get_or_generate`].
    pub fn artifact_url(&self, artifact: &CachedArtifact, mode: UrlMode<'_>) -> String {
        self.layout
            .cache_file_url(&artifact.bucket, &artifact.file_name, mode)
    }

    /// Return the artifact for `key`, generating it first if absent.
    ///
    /// On a miss the producer is called with a temp path inside the bucket's
    /// cache directory and must write exactly the artifact there; the file is
    /// then renamed to the canonical path. On producer failure the temp file
    /// is removed and the failure propagated — nothing becomes visible at the
    /// canonical path.
    ///
    /// After the first success, calls with the same key are pure existence
    /// checks until the key is invalidated.
    pub async fn get_or_generate<F, Fut>(
        &self,
        bucket: &Bucket,
        key: &CacheKey,
        producer: F,
    ) -> StorageResult<CachedArtifact>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let file_name = key.file_name();
        let path = self.layout.cache_file_path(bucket, &file_name);

        if fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(path = %path.display(), "derived cache hit");
            return Ok(self.artifact(bucket, file_name, path));
        }

        let lock = self.lock_for(&path).await;
        let guard = lock.lock().await;

        // Another generator may have finished while we waited on the lock.
        if fs::try_exists(&path).await.unwrap_or(false) {
            drop(guard);
            drop(lock);
            self.release(&path).await;
            tracing::debug!(path = %path.display(), "derived cache hit after lock");
            return Ok(self.artifact(bucket, file_name, path));
        }

        let result = self.generate(bucket, &path, producer).await;

        drop(guard);
        drop(lock);
        self.release(&path).await;

        result?;

        tracing::info!(
            path = %path.display(),
            group = bucket.group_code(),
            "derived artifact generated"
        );

        Ok(self.artifact(bucket, file_name, path))
    }

    async fn generate<F, Fut>(&self, bucket: &Bucket, path: &Path, producer: F) -> StorageResult<()>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        self.layout.ensure_cache_dir(bucket).await?;

        let tmp = temp_sibling(path);
        match producer(tmp.clone()).await {
            Ok(()) => {
                if let Err(source) = fs::rename(&tmp, path).await {
                    let _ = fs::remove_file(&tmp).await;
                    return Err(StorageError::Write {
                        path: path.to_path_buf(),
                        source,
                    });
                }
                Ok(())
            }
            Err(err) => {
                let _ = fs::remove_file(&tmp).await;
                Err(StorageError::Generation(err))
            }
        }
    }

    fn artifact(&self, bucket: &Bucket, file_name: String, path: PathBuf) -> CachedArtifact {
        CachedArtifact {
            bucket: bucket.clone(),
            file_name,
            path,
        }
    }

    async fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    /// Drop the per-key lock once nobody is waiting on it anymore.
    async fn release(&self, path: &Path) {
        let mut locks = self.locks.lock().await;
        let idle = locks
            .get(path)
            .map(|lock| Arc::strong_count(lock) == 1)
            .unwrap_or(false);
        if idle {
            locks.remove(path);
        }
    }
}

/// Hidden temp name next to the canonical path, unique per generation round.
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filedepot_core::StorageConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn cache(root: &Path) -> DerivedCache {
        let layout = StorageLayout::new(StorageConfig::new(root)).unwrap();
        DerivedCache::new(Arc::new(layout))
    }

    fn bucket() -> Bucket {
        Bucket::new("avatars", Some("42")).unwrap()
    }

    fn key() -> CacheKey {
        CacheKey::new(
            "heighten",
            vec![200u32.into(), 80u8.into(), true.into()],
            "abc123.jpg",
        )
    }

    #[tokio::test]
    async fn test_miss_generates_then_hit_skips_producer() {
        let dir = tempdir().unwrap();
        let cache = cache(dir.path());
        let calls = AtomicUsize::new(0);

        let artifact = cache
            .get_or_generate(&bucket(), &key(), |tmp| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    fs::write(&tmp, b"derived").await?;
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(artifact.file_name, "hei_200_80_1_abc123.jpg");
        assert_eq!(fs::read(&artifact.path).await.unwrap(), b"derived");

        // Second call must not invoke the producer again.
        let again = cache
            .get_or_generate(&bucket(), &key(), |tmp| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    fs::write(&tmp, b"regenerated").await?;
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fs::read(&again.path).await.unwrap(), b"derived");
    }

    #[tokio::test]
    async fn test_existence_is_the_only_hit_signal() {
        let dir = tempdir().unwrap();
        let cache = cache(dir.path());
        let bucket = bucket();

        // Pre-seed the canonical path by hand; content is never validated.
        let path = cache.artifact_path(&bucket, &key());
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, b"seeded").await.unwrap();

        let artifact = cache
            .get_or_generate(&bucket, &key(), |_| async {
                panic!("producer must not run on a hit")
            })
            .await
            .unwrap();
        assert_eq!(fs::read(&artifact.path).await.unwrap(), b"seeded");
    }

    #[tokio::test]
    async fn test_producer_failure_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let cache = cache(dir.path());
        let bucket = bucket();

        let err = cache
            .get_or_generate(&bucket, &key(), |tmp| async move {
                // Partial write before the failure.
                fs::write(&tmp, b"half").await?;
                anyhow::bail!("encoder exploded")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Generation(_)));

        // No artifact and no temp leftovers at the canonical location.
        let path = cache.artifact_path(&bucket, &key());
        assert!(!fs::try_exists(&path).await.unwrap());
        let mut entries = fs::read_dir(path.parent().unwrap()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());

        // A later round can generate normally.
        cache
            .get_or_generate(&bucket, &key(), |tmp| async move {
                fs::write(&tmp, b"ok").await?;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(fs::read(&path).await.unwrap(), b"ok");
    }

    #[tokio::test]
    async fn test_concurrent_misses_run_producer_once() {
        let dir = tempdir().unwrap();
        let cache = Arc::new(cache(dir.path()));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_generate(&bucket(), &key(), |tmp| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // Widen the race window.
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        fs::write(&tmp, b"once").await?;
                        Ok(())
                    })
                    .await
            }));
        }

        for handle in handles {
            let artifact = handle.await.unwrap().unwrap();
            assert_eq!(fs::read(&artifact.path).await.unwrap(), b"once");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_artifact_url() {
        let dir = tempdir().unwrap();
        let cache = cache(dir.path());

        let artifact = cache
            .get_or_generate(&bucket(), &key(), |tmp| async move {
                fs::write(&tmp, b"x").await?;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(
            cache.artifact_url(&artifact, UrlMode::Relative),
            "/upload/avatars/42/cache/hei_200_80_1_abc123.jpg"
        );
    }
}
