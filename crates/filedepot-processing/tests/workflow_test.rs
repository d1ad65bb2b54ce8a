//! End-to-end workflow: receive an upload, persist it, serve transformed
//! derivatives, invalidate on update, and clean up on deletion.

use std::sync::Arc;

use filedepot_core::{
    ReceivedUpload, StorageConfig, StoredFile, UploadPolicy,
};
use filedepot_storage::{DerivedCache, FileStore, StorageLayout, UrlMode};
use filedepot_processing::{Anchor, ImageBackend, Transformer};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use tempfile::tempdir;

fn setup(root: &std::path::Path) -> (FileStore, Transformer) {
    let layout = Arc::new(StorageLayout::new(StorageConfig::new(root)).unwrap());
    let cache = Arc::new(DerivedCache::new(layout.clone()));
    let store = FileStore::new(layout, cache.clone());
    let transformer = Transformer::with_default_backend(cache);
    (store, transformer)
}

fn write_source_png(path: &std::path::Path, width: u32, height: u32) {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([120, 80, 40, 255]),
    ))
    .save_with_format(path, image::ImageFormat::Png)
    .unwrap();
}

#[tokio::test]
async fn upload_transform_invalidate_delete() {
    let dir = tempdir().unwrap();
    let (store, transformer) = setup(dir.path());

    // 1. Ingestion hands over a temp file; policy accepts it.
    let temp = dir.path().join("ingest-1.tmp");
    write_source_png(&temp, 100, 50);
    let upload = ReceivedUpload {
        temp_path: temp.clone(),
        original_name: "banner".to_string(),
        extension: "png".to_string(),
        mime: "image/png".to_string(),
        size: std::fs::metadata(&temp).unwrap().len(),
        fault: None,
    };
    let policy = UploadPolicy {
        allowed_extensions: Some(vec!["png".to_string(), "jpg".to_string()]),
    };
    upload.validate(&policy).unwrap();
    assert_eq!(
        filedepot_processing::ensure_image_upload(&ImageBackend, &upload).unwrap(),
        (100, 50)
    );

    // 2. Build the record, let the (external) persistence layer accept it,
    //    then move the file into storage.
    let mut record = StoredFile::from_upload("banners", Some("7".to_string()), &upload);
    record.id = Some(1); // persistence accepted
    let path = store.save_from_temp(&record, &temp).await.unwrap();
    assert!(path.ends_with(format!("upload/banners/7/{}", record.sys_name)));
    assert_eq!(
        store.url_of(&record, UrlMode::Relative).unwrap(),
        format!("/upload/banners/7/{}", record.sys_name)
    );

    // 3. Serve derivatives; the second call is a cache read.
    let thumb = transformer.heighten(&record, 25, 80, true).await.unwrap();
    assert_eq!(image::open(&thumb.path).unwrap().dimensions(), (50, 25));
    assert_eq!(
        transformer.cache().artifact_url(&thumb, UrlMode::Relative),
        format!("/upload/banners/7/cache/hei_25_80_1_{}", record.sys_name)
    );
    let again = transformer.heighten(&record, 25, 80, true).await.unwrap();
    assert_eq!(again.path, thumb.path);

    let square = transformer
        .cover(&record, 30, 30, Anchor::Center, 80, true)
        .await
        .unwrap();
    assert_eq!(image::open(&square.path).unwrap().dimensions(), (30, 30));

    // 4. Source content changes: artifacts for it are flushed, then rebuilt
    //    lazily on the next request.
    write_source_png(&temp, 80, 80);
    let data = std::fs::read(&temp).unwrap();
    store.replace(&record, &data).await.unwrap();
    assert!(!thumb.path.exists());
    assert!(!square.path.exists());

    let rebuilt = transformer.heighten(&record, 25, 80, true).await.unwrap();
    assert_eq!(image::open(&rebuilt.path).unwrap().dimensions(), (25, 25));

    // 5. Deletion removes the original and its artifacts; repeating it is
    //    still success.
    store.remove(&record).await.unwrap();
    assert!(!store.path_of(&record).unwrap().exists());
    assert!(!rebuilt.path.exists());
    store.remove(&record).await.unwrap();
}
