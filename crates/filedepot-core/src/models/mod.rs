pub mod bucket;
pub mod file;

pub use bucket::{Bucket, BucketError};
pub use file::StoredFile;
