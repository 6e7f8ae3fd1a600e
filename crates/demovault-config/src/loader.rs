//! YAML loading with environment overrides.
//!
//! # Design
//! - The document is read exactly once at startup; callers hold the result as an
//!   immutable value.
//! - Environment lookups go through a closure so overrides are testable without
//!   mutating the process environment.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{AppConfig, Secret};
use crate::validate::validate;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "DEMOVAULT_CONFIG";
/// Configuration file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "demovault.yaml";
/// Environment variable overriding the control-plane user name.
pub const CONTROL_USERNAME_ENV: &str = "DEMOVAULT_CONTROL_USERNAME";
/// Environment variable overriding the control-plane password.
pub const CONTROL_PASSWORD_ENV: &str = "DEMOVAULT_CONTROL_PASSWORD";

/// Load, override and validate the configuration named by the process environment.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or fails validation.
pub fn load_from_env() -> ConfigResult<AppConfig> {
    let path = std::env::var(CONFIG_PATH_ENV)
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let mut config = read_document(&path)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate(&config)?;
    Ok(config)
}

/// Load and validate a configuration file without consulting the environment.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or fails validation.
pub fn load_from_path(path: &Path) -> ConfigResult<AppConfig> {
    let config = read_document(path)?;
    validate(&config)?;
    Ok(config)
}

/// Parse a YAML document into an unvalidated configuration.
///
/// # Errors
///
/// Returns an error if the document does not match the schema.
pub fn parse_yaml(raw: &str) -> ConfigResult<AppConfig> {
    serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse { path: None, source })
}

/// Replace credentials with values supplied by `lookup`, when present and non-empty.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(username) = lookup(CONTROL_USERNAME_ENV).filter(|v| !v.trim().is_empty()) {
        config.control_plane.username = username;
    }
    if let Some(password) = lookup(CONTROL_PASSWORD_ENV).filter(|v| !v.is_empty()) {
        config.control_plane.password = Secret::new(password);
    }
}

fn read_document(path: &Path) -> ConfigResult<AppConfig> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::io("config.read", path, source))?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: Some(path.to_path_buf()),
        source,
    })
}
