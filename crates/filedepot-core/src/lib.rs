//! Filedepot Core Library
//!
//! Domain types shared by the storage and processing crates: the stored-file
//! record, bucket addressing, storage configuration, and the mapping of
//! upload-ingestion faults to validation errors.
//!
//! Persistence of records and HTTP ingestion are external collaborators; this
//! crate only defines the values they exchange with the storage layer.

pub mod config;
pub mod constants;
pub mod models;
pub mod upload;

// Re-export commonly used types
pub use config::{ConfigError, StorageConfig, UrlBase};
pub use models::{Bucket, BucketError, StoredFile};
pub use upload::{ReceivedUpload, UploadError, UploadFault, UploadPolicy};
