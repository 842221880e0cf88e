//! Error types for archive scanning.
//!
//! Only archive-level failures are meant to reach the caller of a scan.
//! [`ScanError::EntryRead`] is produced per entry and absorbed by the
//! [`Scanner`](crate::scan::Scanner), which logs it and moves on.

use thiserror::Error;

/// Main error type for zipcheck operations.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The input cannot be parsed as an archive at all
    #[error("Invalid archive: {0}")]
    ArchiveFormat(String),

    /// A single entry inside an otherwise valid archive cannot be read
    #[error("Failed to read entry {name}: {reason}")]
    EntryRead { name: String, reason: String },

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub(crate) fn archive(message: impl Into<String>) -> Self {
        ScanError::ArchiveFormat(message.into())
    }

    pub(crate) fn entry(name: &str, reason: impl Into<String>) -> Self {
        ScanError::EntryRead {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for zipcheck operations
pub type Result<T> = std::result::Result<T, ScanError>;
