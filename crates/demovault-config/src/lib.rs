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

//! File-backed configuration for the demovault jobs.
//!
//! Layout: `model.rs` (typed configuration document), `loader.rs` (YAML + env overrides),
//! `validate.rs` (post-load validation), `defaults.rs` (serde defaults).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    CONFIG_PATH_ENV, CONTROL_PASSWORD_ENV, CONTROL_USERNAME_ENV, DEFAULT_CONFIG_PATH,
    apply_env_overrides, load_from_env, load_from_path, parse_yaml,
};
pub use model::{
    AppConfig, ControlPlaneSettings, DemoSettings, LogFormatSetting, LoggingSettings,
    MapSettings, Secret, ServerConfig, StorageSettings,
};
pub use validate::validate;
