//! Upload ingestion mapping.
//!
//! HTTP multipart handling itself is an external collaborator. It hands over
//! a temporary file plus metadata and, when reception failed, a fault code
//! from a closed set. This module maps those faults to human-readable
//! validation errors and turns an accepted upload into a `StoredFile` record.

use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::StoredFile;

/// Reception fault reported by the upload ingestion collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFault {
    SizeExceeded,
    Partial,
    NoFile,
    NoTmpDir,
    CantWrite,
    ExtensionBlocked,
}

impl UploadFault {
    /// Map a raw ingestion error code to a fault. Unknown codes yield `None`;
    /// use [`UploadFault::description_for_raw`] when only a message is
    /// needed.
    pub fn from_raw(code: u32) -> Option<Self> {
        match code {
            1 | 2 => Some(UploadFault::SizeExceeded),
            3 => Some(UploadFault::Partial),
            4 => Some(UploadFault::NoFile),
            6 => Some(UploadFault::NoTmpDir),
            7 => Some(UploadFault::CantWrite),
            8 => Some(UploadFault::ExtensionBlocked),
            _ => None,
        }
    }

    /// Human-readable description of the fault.
    pub fn description(self) -> &'static str {
        match self {
            UploadFault::SizeExceeded => {
                "The received file exceeds the maximum allowed size"
            }
            UploadFault::Partial => "The file was only partially received",
            UploadFault::NoFile => "No file was received",
            UploadFault::NoTmpDir => "The temporary upload directory is missing",
            UploadFault::CantWrite => "Failed to write the received file to disk",
            UploadFault::ExtensionBlocked => "The upload was stopped by a blocked extension",
        }
    }

    /// Description for a raw code; unknown codes fall back to the generic
    /// "no file" description.
    pub fn description_for_raw(code: u32) -> &'static str {
        Self::from_raw(code)
            .unwrap_or(UploadFault::NoFile)
            .description()
    }
}

/// Upload validation errors
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{}", .0.description())]
    Fault(UploadFault),

    #[error("files with extension {0:?} are not allowed")]
    ExtensionNotAllowed(String),

    #[error("the received file is not an image")]
    NotAnImage,
}

/// What the ingestion collaborator hands over for one received file.
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    /// Where ingestion parked the received bytes.
    pub temp_path: PathBuf,
    /// Original filename without extension.
    pub original_name: String,
    /// Original extension, without the dot.
    pub extension: String,
    pub mime: String,
    pub size: u64,
    /// Reception fault, if ingestion reported one.
    pub fault: Option<UploadFault>,
}

/// Acceptance policy applied to received uploads.
#[derive(Debug, Clone, Default)]
pub struct UploadPolicy {
    /// Allowed extensions, lowercase, without the dot. `None` allows any.
    pub allowed_extensions: Option<Vec<String>>,
}

impl ReceivedUpload {
    /// Validate the upload against the policy.
    ///
    /// A reported reception fault always wins over policy checks.
    pub fn validate(&self, policy: &UploadPolicy) -> Result<(), UploadError> {
        if let Some(fault) = self.fault {
            return Err(UploadError::Fault(fault));
        }

        if let Some(allowed) = &policy.allowed_extensions {
            let extension = self.extension.to_lowercase();
            if !allowed.iter().any(|e| *e == extension) {
                return Err(UploadError::ExtensionNotAllowed(self.extension.clone()));
            }
        }

        Ok(())
    }
}

impl StoredFile {
    /// Build an unpersisted record from a validated upload.
    ///
    /// The system filename is freshly generated (`{uuid}.{ext}`) and unique
    /// across the storage namespace. The record's `id` stays `None` until
    /// the persistence layer accepts it.
    pub fn from_upload(
        group_code: impl Into<String>,
        object_id: Option<String>,
        upload: &ReceivedUpload,
    ) -> StoredFile {
        let now = Utc::now();

        StoredFile {
            id: None,
            group_code: group_code.into(),
            object_id,
            sys_name: format!("{}.{}", Uuid::new_v4().simple(), upload.extension),
            original_name: upload.original_name.clone(),
            original_extension: upload.extension.clone(),
            mime: upload.mime.clone(),
            size: upload.size,
            created_at: now,
            updated_at: now,
        }
    }
}
