//! Cross-component consistency: file lifecycle against the derived cache,
//! exercised through the public API only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use filedepot_core::{Bucket, StorageConfig, StoredFile};
use filedepot_storage::{CacheKey, DerivedCache, FileStore, StorageLayout, UrlMode};
use tempfile::tempdir;
use tokio::fs;

fn setup(root: &std::path::Path) -> (Arc<StorageLayout>, Arc<DerivedCache>, FileStore) {
    let layout = Arc::new(StorageLayout::new(StorageConfig::new(root)).unwrap());
    let cache = Arc::new(DerivedCache::new(layout.clone()));
    let store = FileStore::new(layout.clone(), cache.clone());
    (layout, cache, store)
}

fn record(sys_name: &str) -> StoredFile {
    StoredFile {
        id: Some(1),
        group_code: "docs".to_string(),
        object_id: None,
        sys_name: sys_name.to_string(),
        original_name: "report".to_string(),
        original_extension: "pdf".to_string(),
        mime: "application/pdf".to_string(),
        size: 3,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn key_for(code: &str, sys_name: &str) -> CacheKey {
    CacheKey::new(code, vec![120u32.into(), 75u8.into(), false.into()], sys_name)
}

#[tokio::test]
async fn generation_after_flush_recreates_the_artifact() {
    let dir = tempdir().unwrap();
    let (_, cache, store) = setup(dir.path());
    let record = record("abc123.pdf");
    let bucket = record.bucket().unwrap();

    store.save(&record, b"one").await.unwrap();

    let generations = AtomicUsize::new(0);
    let produce = |tmp: std::path::PathBuf| {
        generations.fetch_add(1, Ordering::SeqCst);
        async move {
            fs::write(&tmp, b"derived").await?;
            Ok(())
        }
    };

    let key = key_for("heighten", &record.sys_name);
    cache.get_or_generate(&bucket, &key, produce).await.unwrap();
    cache.get_or_generate(&bucket, &key, produce).await.unwrap();
    assert_eq!(generations.load(Ordering::SeqCst), 1);

    // Bulk flush drops the tree; the next request regenerates.
    cache.flush_bucket(&bucket).await.unwrap();
    cache.get_or_generate(&bucket, &key, produce).await.unwrap();
    assert_eq!(generations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn replace_invalidates_only_the_replaced_source() {
    let dir = tempdir().unwrap();
    let (_, cache, store) = setup(dir.path());

    let first = record("abc123.pdf");
    let mut second = record("xyz987.pdf");
    second.id = Some(2);
    let bucket = first.bucket().unwrap();

    store.save(&first, b"one").await.unwrap();
    store.save(&second, b"two").await.unwrap();

    for rec in [&first, &second] {
        let key = key_for("heighten", &rec.sys_name);
        cache
            .get_or_generate(&bucket, &key, |tmp| async move {
                fs::write(&tmp, b"derived").await?;
                Ok(())
            })
            .await
            .unwrap();
    }

    store.replace(&first, b"changed").await.unwrap();

    let cache_dir = cache.layout().cache_dir(&bucket);
    assert!(!cache_dir.join("hei_120_75_0_abc123.pdf").exists());
    assert!(cache_dir.join("hei_120_75_0_xyz987.pdf").exists());
}

#[tokio::test]
async fn urls_and_paths_stay_in_lockstep() {
    let dir = tempdir().unwrap();
    let (layout, cache, _) = setup(dir.path());
    let bucket = Bucket::new("avatars", Some("42")).unwrap();

    let key = key_for("widen", "abc123.jpg");
    let artifact = cache
        .get_or_generate(&bucket, &key, |tmp| async move {
            fs::write(&tmp, b"derived").await?;
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(artifact.path, layout.cache_file_path(&bucket, &artifact.file_name));
    assert_eq!(
        cache.artifact_url(&artifact, UrlMode::Relative),
        "/upload/avatars/42/cache/wid_120_75_0_abc123.jpg"
    );
    assert_eq!(
        cache.artifact_url(
            &artifact,
            UrlMode::Absolute {
                host: "https://files.example.com"
            }
        ),
        "https://files.example.com/upload/avatars/42/cache/wid_120_75_0_abc123.jpg"
    );
}
