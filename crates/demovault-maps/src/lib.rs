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

//! Map-cache pruning on remote game servers.
//!
//! Layout: `tree.rs` (recursive size and depth-first deletion over a remote tree),
//! `orchestrator.rs` (size gate and run-state coordination), `error.rs`.

pub mod error;
pub mod orchestrator;
pub mod tree;

pub use error::{MapsError, MapsResult};
pub use orchestrator::{AbortReason, MapDeletionDecision, MapDeletionOrchestrator};
pub use tree::{TreeDeletion, delete_tree_contents, tree_size};
