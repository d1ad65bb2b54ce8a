//! Shared constants.

/// Name of the cache subdirectory inside every bucket directory.
///
/// Derived artifacts live under `{bucket_dir}/cache/`; the name is part of
/// the on-disk layout and must not change for existing stored data.
pub const CACHE_DIR_NAME: &str = "cache";

/// Default name of the storage directory under the storage root.
pub const DEFAULT_STORAGE_DIR: &str = "upload";
