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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (config and demo name builders), memory.rs (in-memory remote file
//! tree), lifecycle.rs (scripted server lifecycle).

pub mod fixtures;
pub mod lifecycle;
pub mod memory;

pub use lifecycle::{LifecycleCall, ScriptedLifecycle};
pub use memory::{MemoryRemote, RemoteCall};
