//! Storage configuration.
//!
//! Configuration is validated once when a `StorageLayout` is constructed.
//! An invalid configuration is a fatal initialization error, never a
//! per-call error.

use std::path::PathBuf;

use thiserror::Error;

use crate::constants::DEFAULT_STORAGE_DIR;

/// Base for public URLs to stored files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlBase {
    /// No configured base: relative URLs are root-relative paths, absolute
    /// URLs are prefixed with the scheme+host of the current request,
    /// supplied by the caller at URL-building time.
    CurrentHost,
    /// Fixed base URL (e.g. a CDN origin). URLs are always emitted fully
    /// prefixed, regardless of the requested URL mode.
    Fixed(String),
}

/// Configuration for the file storage tree.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory under which the storage directory is created
    /// (e.g. the web root).
    pub storage_root: PathBuf,
    /// Name of the storage directory under the root. A single path segment.
    pub storage_dir: String,
    /// Base for generated URLs.
    pub base_url: UrlBase,
}

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("storage root path must not be empty")]
    EmptyRoot,

    #[error("storage directory name {0:?} must be a single non-empty path segment")]
    InvalidStorageDir(String),

    #[error("storage base URL {0:?} must be a non-empty http(s) URL")]
    InvalidBaseUrl(String),
}

impl StorageConfig {
    /// Create a configuration with the default storage directory name and
    /// current-host URLs.
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        StorageConfig {
            storage_root: storage_root.into(),
            storage_dir: DEFAULT_STORAGE_DIR.to_string(),
            base_url: UrlBase::CurrentHost,
        }
    }

    pub fn with_storage_dir(mut self, storage_dir: impl Into<String>) -> Self {
        self.storage_dir = storage_dir.into();
        self
    }

    pub fn with_base_url(mut self, base_url: UrlBase) -> Self {
        self.base_url = base_url;
        self
    }

    /// Validate the configuration. Called once at layout construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRoot);
        }

        if self.storage_dir.trim().is_empty()
            || self.storage_dir.contains('/')
            || self.storage_dir.contains('\\')
            || self.storage_dir.contains("..")
        {
            return Err(ConfigError::InvalidStorageDir(self.storage_dir.clone()));
        }

        if let UrlBase::Fixed(url) = &self.base_url {
            let trimmed = url.trim();
            if trimmed.is_empty()
                || !(trimmed.starts_with("http://") || trimmed.starts_with("https://"))
            {
                return Err(ConfigError::InvalidBaseUrl(url.clone()));
            }
        }

        Ok(())
    }
}
