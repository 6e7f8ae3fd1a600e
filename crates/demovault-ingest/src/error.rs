//! # Design
//!
//! - Provide structured, constant-message errors for the ingestion pipeline.
//! - Capture operation context (paths, inputs) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::io;
use std::path::PathBuf;

use demovault_remote::RemoteError;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors produced by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// IO failures while interacting with the local filesystem.
    #[error("ingest io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Zip archive failures.
    #[error("ingest zip failure")]
    Zip {
        /// Operation that triggered the archive failure.
        operation: &'static str,
        /// Path involved in the archive failure.
        path: PathBuf,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },
    /// Remote file source failures.
    #[error("ingest remote failure")]
    Remote {
        /// Operation that triggered the remote failure.
        operation: &'static str,
        /// Remote path involved.
        path: String,
        /// Underlying remote error.
        source: RemoteError,
    },
    /// Input validation failures.
    #[error("ingest invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl IngestError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn zip(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: zip::result::ZipError,
    ) -> Self {
        Self::Zip {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn remote(
        operation: &'static str,
        path: impl Into<String>,
        source: RemoteError,
    ) -> Self {
        Self::Remote {
            operation,
            path: path.into(),
            source,
        }
    }
}
