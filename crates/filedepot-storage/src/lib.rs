//! Filedepot Storage Library
//!
//! This crate owns the on-disk layout of stored files and their derived
//! artifacts, and the cache protocol on top of it.
//!
//! # Layout
//!
//! The layout is fixed and must stay bit-for-bit compatible with existing
//! stored data:
//!
//! - **Original**: `{storage_root}/{storage_dir}/{group}[/{object}]/{sys_name}`
//! - **Derived**: `{storage_root}/{storage_dir}/{group}[/{object}]/cache/{prefix3}_{param}_..._{sys_name}`
//!
//! URLs mirror the same structure rooted at the configured base URL, or at
//! the current request host when no base is configured.
//!
//! Cache-file naming is centralized in the `cache_key` module so every
//! consumer produces identical names for identical inputs.

pub mod cache_key;
pub mod derived_cache;
pub mod error;
pub mod invalidate;
pub mod layout;
pub mod store;

// Re-export commonly used types
pub use cache_key::{CacheKey, CacheParam};
pub use derived_cache::{CachedArtifact, DerivedCache};
pub use error::{StorageError, StorageResult};
pub use layout::{StorageLayout, UrlMode};
pub use store::FileStore;
