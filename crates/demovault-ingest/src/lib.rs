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
#![allow(clippy::module_name_repetitions)]

//! Demo ingestion pipeline: readiness gating, atomic staging, the latest window and
//! numbered archive rotation.
//!
//! Layout: `timestamp.rs` (file name timestamps), `gate.rs` (accept/reject remote
//! files), `writer.rs` (write-then-rename), `window.rs` (bounded recency copy),
//! `archive.rs` (zip batches), `service.rs` (per-server pipeline).

pub mod archive;
pub mod error;
pub mod gate;
pub mod service;
pub mod timestamp;
pub mod window;
pub mod writer;

pub use archive::{ArchiveBatch, ArchiveBatcher, ArchiveRange};
pub use error::{IngestError, IngestResult};
pub use gate::{GateDecision, IngestGate, RejectReason};
pub use service::{IngestReport, IngestService};
pub use timestamp::{TIMESTAMP_FORMAT, parse_name_timestamp, timestamp_or_modified, timestamp_or_now};
pub use window::{LatestWindow, WindowInsert};
pub use writer::{TEMP_SUFFIX, purge_temp_artifacts, temp_path_for, write_atomically};
