//! Path and URL resolution for the storage tree.
//!
//! `StorageLayout` is a pure mapping from `(config, bucket)` to directories
//! and URLs; nothing here is cached beyond the call. Directory creation is
//! idempotent and race-safe: "already exists" is success.

use std::path::PathBuf;

use filedepot_core::constants::CACHE_DIR_NAME;
use filedepot_core::{Bucket, ConfigError, StorageConfig, UrlBase};
use tokio::fs;

use crate::error::{StorageError, StorageResult};

/// How a URL should be rendered.
///
/// With a fixed configured base URL both modes yield the fully prefixed URL.
/// Without one, `Relative` yields a root-relative path and `Absolute` prefixes
/// the scheme+host of the current request, supplied by the caller.
#[derive(Debug, Clone, Copy)]
pub enum UrlMode<'a> {
    Relative,
    Absolute { host: &'a str },
}

/// Resolves bucket directories and URLs under one storage configuration.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    config: StorageConfig,
}

impl StorageLayout {
    /// Validate the configuration and build a layout.
    ///
    /// Configuration problems are fatal here, never reported per call.
    pub fn new(config: StorageConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(StorageLayout { config })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Directory holding a bucket's original files:
    /// `{root}/{dir}/{group}[/{object}]`.
    pub fn upload_dir(&self, bucket: &Bucket) -> PathBuf {
        let mut path = self.config.storage_root.join(&self.config.storage_dir);
        path.push(bucket.group_code());
        if let Some(object_id) = bucket.object_id() {
            path.push(object_id);
        }
        path
    }

    /// Directory holding a bucket's derived artifacts:
    /// `{upload_dir}/cache`.
    pub fn cache_dir(&self, bucket: &Bucket) -> PathBuf {
        self.upload_dir(bucket).join(CACHE_DIR_NAME)
    }

    /// Path of one original file in a bucket.
    pub fn file_path(&self, bucket: &Bucket, sys_name: &str) -> PathBuf {
        self.upload_dir(bucket).join(sys_name)
    }

    /// Path of one derived artifact in a bucket's cache directory.
    pub fn cache_file_path(&self, bucket: &Bucket, cache_name: &str) -> PathBuf {
        self.cache_dir(bucket).join(cache_name)
    }

    fn url_path(&self, bucket: &Bucket) -> String {
        let mut url = format!("/{}/{}", self.config.storage_dir, bucket.group_code());
        if let Some(object_id) = bucket.object_id() {
            url.push('/');
            url.push_str(object_id);
        }
        url
    }

    /// URL of a bucket's upload directory.
    pub fn upload_url(&self, bucket: &Bucket, mode: UrlMode<'_>) -> String {
        let path = self.url_path(bucket);
        match (&self.config.base_url, mode) {
            (UrlBase::Fixed(base), _) => format!("{}{}", base.trim_end_matches('/'), path),
            (UrlBase::CurrentHost, UrlMode::Relative) => path,
            (UrlBase::CurrentHost, UrlMode::Absolute { host }) => {
                format!("{}{}", host.trim_end_matches('/'), path)
            }
        }
    }

    /// URL of a bucket's cache directory.
    pub fn cache_url(&self, bucket: &Bucket, mode: UrlMode<'_>) -> String {
        format!("{}/{}", self.upload_url(bucket, mode), CACHE_DIR_NAME)
    }

    /// URL of one original file.
    pub fn file_url(&self, bucket: &Bucket, sys_name: &str, mode: UrlMode<'_>) -> String {
        format!("{}/{}", self.upload_url(bucket, mode), sys_name)
    }

    /// URL of one derived artifact.
    pub fn cache_file_url(&self, bucket: &Bucket, cache_name: &str, mode: UrlMode<'_>) -> String {
        format!("{}/{}", self.cache_url(bucket, mode), cache_name)
    }

    /// Create the bucket's upload directory if it does not exist yet.
    pub async fn ensure_upload_dir(&self, bucket: &Bucket) -> StorageResult<PathBuf> {
        let path = self.upload_dir(bucket);
        self.ensure_dir(&path).await?;
        Ok(path)
    }

    /// Create the bucket's cache directory if it does not exist yet.
    pub async fn ensure_cache_dir(&self, bucket: &Bucket) -> StorageResult<PathBuf> {
        let path = self.cache_dir(bucket);
        self.ensure_dir(&path).await?;
        Ok(path)
    }

    async fn ensure_dir(&self, path: &PathBuf) -> StorageResult<()> {
        // create_dir_all treats an existing directory as success, so two
        // racing callers cannot fail each other here.
        fs::create_dir_all(path)
            .await
            .map_err(|source| StorageError::DirCreate {
                path: path.clone(),
                source,
            })
    }
}
