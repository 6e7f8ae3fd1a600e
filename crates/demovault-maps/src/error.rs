//! # Design
//!
//! - Constant messages; the remote path and server id travel as fields.
//! - The orchestrator folds these into abort reasons after logging them.

use demovault_remote::{LifecycleError, RemoteError};
use thiserror::Error;

/// Result alias for map pruning operations.
pub type MapsResult<T> = Result<T, MapsError>;

/// Failures raised while inspecting or pruning a map cache.
#[derive(Debug, Error)]
pub enum MapsError {
    /// A remote file operation failed.
    #[error("map cache remote operation failed")]
    Remote {
        /// Operation identifier.
        operation: &'static str,
        /// Remote path involved.
        path: String,
        /// Underlying remote error.
        source: RemoteError,
    },
    /// A lifecycle request failed.
    #[error("map cache lifecycle request failed")]
    Lifecycle {
        /// Operation identifier.
        operation: &'static str,
        /// Server the request targeted.
        server_id: String,
        /// Underlying lifecycle error.
        source: LifecycleError,
    },
}

impl MapsError {
    pub(crate) fn remote(operation: &'static str, path: impl Into<String>, source: RemoteError) -> Self {
        Self::Remote {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn lifecycle(
        operation: &'static str,
        server_id: impl Into<String>,
        source: LifecycleError,
    ) -> Self {
        Self::Lifecycle {
            operation,
            server_id: server_id.into(),
            source,
        }
    }
}
