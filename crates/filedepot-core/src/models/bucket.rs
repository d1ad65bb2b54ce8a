//! Bucket addressing.
//!
//! A bucket is the `(group_code, object_id)` pair that names one storage
//! subdirectory: `{storage_dir}/{group_code}[/{object_id}]`. Segments are
//! validated on construction so a bucket can never escape the storage tree.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid bucket segment
#[derive(Debug, Error)]
#[error("invalid bucket segment {segment:?}: {reason}")]
pub struct BucketError {
    pub segment: String,
    pub reason: &'static str,
}

/// Identifies one storage/cache subdirectory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bucket {
    group_code: String,
    object_id: Option<String>,
}

impl Bucket {
    /// Create a bucket for a file group, optionally scoped to an owning
    /// object.
    pub fn new(
        group_code: impl Into<String>,
        object_id: Option<impl Into<String>>,
    ) -> Result<Self, BucketError> {
        let group_code = group_code.into();
        validate_segment(&group_code)?;

        let object_id = match object_id {
            Some(id) => {
                let id = id.into();
                validate_segment(&id)?;
                Some(id)
            }
            None => None,
        };

        Ok(Bucket {
            group_code,
            object_id,
        })
    }

    /// Bucket with no owning-object segment.
    pub fn group(group_code: impl Into<String>) -> Result<Self, BucketError> {
        Self::new(group_code, None::<String>)
    }

    pub fn group_code(&self) -> &str {
        &self.group_code
    }

    pub fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }
}

fn validate_segment(segment: &str) -> Result<(), BucketError> {
    let fail = |reason| {
        Err(BucketError {
            segment: segment.to_string(),
            reason,
        })
    };

    if segment.trim().is_empty() {
        return fail("must not be empty");
    }
    if segment.contains('/') || segment.contains('\\') {
        return fail("must not contain path separators");
    }
    if segment == "." || segment == ".." {
        return fail("must not be a relative path component");
    }

    Ok(())
}
