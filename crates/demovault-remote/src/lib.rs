#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Capabilities for talking to remote game servers.
//!
//! Layout: `source.rs` (remote file tree capability), `lifecycle.rs` (server run-state
//! capability), `ftp.rs` (FTP-backed file source), `control.rs` (REST-backed lifecycle
//! client), `error.rs`.

pub mod control;
pub mod error;
pub mod ftp;
pub mod lifecycle;
pub mod source;

pub use control::{ControlPlaneClient, ControlPlaneConnector};
pub use error::{LifecycleError, LifecycleResult, RemoteError, RemoteResult};
pub use ftp::{FtpConnector, FtpSession};
pub use lifecycle::{LifecycleConnector, ServerLifecycle};
pub use source::{EntryKind, RemoteConnector, RemoteEntry, RemoteFileSource, file_name, join};
