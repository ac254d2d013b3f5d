//! Error taxonomy for archive operations.
//!
//! Only run-level problems surface as [`ArchiveError`]. Problems scoped to a
//! single log file (bad filename, unreadable file, failed write) are recorded
//! as [`FileOutcome`](crate::models::FileOutcome) values inside the import
//! report and never abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// Problems with the source tree that make an import impossible.
///
/// Always raised before the store is touched.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("ZNC base path not found: {}", .0.display())]
    SourceRootMissing(PathBuf),

    #[error("network '{network}' not found under {}", .root.display())]
    NetworkNotFound { network: String, root: PathBuf },
}

/// Main error type for archive operations.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("invalid query: {0}")]
    QueryValidation(String),

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ArchiveError::QueryValidation(msg.into())
    }
}

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;
