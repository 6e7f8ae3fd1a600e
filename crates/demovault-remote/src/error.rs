//! # Design
//!
//! - Constant error messages with the remote path or URL carried as context.
//! - File transport and control-plane failures stay separate so callers can map them
//!   to different abort reasons.

use thiserror::Error;

/// Result alias for remote file operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Result alias for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Failures raised by a remote file source.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Establishing or authenticating the session failed.
    #[error("remote connect failed")]
    Connect {
        /// Remote host.
        host: String,
        /// Remote port.
        port: u16,
        /// Underlying transport error.
        source: suppaftp::FtpError,
    },
    /// Resolving the remote host produced no address.
    #[error("remote host did not resolve")]
    Resolve {
        /// Remote host.
        host: String,
        /// Remote port.
        port: u16,
    },
    /// A transport command failed.
    #[error("remote command failed")]
    Command {
        /// Operation identifier.
        operation: &'static str,
        /// Remote path the command targeted.
        path: String,
        /// Underlying transport error.
        source: suppaftp::FtpError,
    },
    /// The remote side refused the operation without a transport error.
    #[error("remote operation rejected")]
    Rejected {
        /// Operation identifier.
        operation: &'static str,
        /// Remote path the operation targeted.
        path: String,
        /// Static reason for the refusal.
        reason: &'static str,
    },
}

impl RemoteError {
    pub(crate) const fn command(
        operation: &'static str,
        path: String,
        source: suppaftp::FtpError,
    ) -> Self {
        Self::Command {
            operation,
            path,
            source,
        }
    }
}

/// Failures raised by a server lifecycle client.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Building the HTTP client failed.
    #[error("lifecycle client construction failed")]
    Client {
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },
    /// The request could not be completed.
    #[error("lifecycle request failed")]
    Http {
        /// Operation identifier.
        operation: &'static str,
        /// URL used for the request.
        url: String,
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },
    /// The control plane answered with a non-success status.
    #[error("lifecycle response status error")]
    HttpStatus {
        /// Operation identifier.
        operation: &'static str,
        /// URL used for the request.
        url: String,
        /// HTTP status code returned by the server.
        status: u16,
    },
    /// The control plane refused the operation.
    #[error("lifecycle operation rejected")]
    Rejected {
        /// Operation identifier.
        operation: &'static str,
        /// Server the operation targeted.
        server_id: String,
    },
}
