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

//! Demovault application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (dependency wiring and run modes), `jobs.rs` (per-server job
//! bodies), `scheduler.rs` (single-flight runner and interval loops), `error.rs`.

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level errors.
pub mod error;
/// Ingestion and map pruning job bodies.
pub mod jobs;
/// Single-flight job runner and interval scheduling.
pub mod scheduler;

pub use bootstrap::{BootstrapDependencies, RUN_ONCE_ENV, RunMode, run_app, run_app_with};
pub use error::{AppError, AppResult};
pub use jobs::JobContext;
pub use scheduler::{FlightGuard, JobRunner, SingleFlight, spawn_interval};
