//! Error types for the lending ledger

use thiserror::Error;

/// Main ledger error type
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Required field missing or uniqueness violation on a key field.
    /// Carries the offending field name so the caller can surface a
    /// field-specific message. No partial write occurs.
    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    /// The asset already has an active (unreturned) loan per the caller's
    /// pre-check. Raised by the borrowing collaborator, never by the
    /// ledger's insert path itself.
    #[error("Asset '{0}' already has an active loan")]
    BusyAsset(String),

    /// Primary spreadsheet writer unavailable or failed mid-serialization.
    /// Recovered internally by the legacy fallback writer; only surfaced
    /// when the fallback fails too.
    #[error("Spreadsheet writer unavailable: {0}")]
    ExportUnavailable(String),

    /// Spreadsheet export requested with zero matching records. A user
    /// notice, not a fault; no file is produced.
    #[error("No records match the report filter")]
    EmptyExport,

    /// The printable document's viewing context could not be opened.
    /// Raised by the presenting collaborator; no automatic retry.
    #[error("Could not open print view: {0}")]
    Presentation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
