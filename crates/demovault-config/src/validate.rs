//! Validation applied after the configuration document is parsed.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{AppConfig, ServerConfig, StorageSettings};

/// Validate cross-field constraints the schema cannot express.
///
/// # Errors
///
/// Returns the first violated constraint.
pub fn validate(config: &AppConfig) -> ConfigResult<()> {
    if config.servers.is_empty() {
        return Err(ConfigError::invalid("servers", "servers", None, "empty"));
    }

    validate_storage("storage", &config.storage)?;

    if config.demos.interval_minutes == 0 {
        return Err(ConfigError::invalid(
            "demos",
            "interval_minutes",
            Some("0".into()),
            "zero",
        ));
    }
    if config.demos.allowed_extensions.is_empty()
        || config
            .demos
            .allowed_extensions
            .iter()
            .any(|ext| ext.trim().is_empty())
    {
        return Err(ConfigError::invalid(
            "demos",
            "allowed_extensions",
            None,
            "empty",
        ));
    }

    if config.maps.interval_minutes == 0 {
        return Err(ConfigError::invalid(
            "maps",
            "interval_minutes",
            Some("0".into()),
            "zero",
        ));
    }
    if config.maps.content_subdir.trim().is_empty() {
        return Err(ConfigError::invalid("maps", "content_subdir", None, "empty"));
    }
    if config.maps.manifest_file.contains('/') {
        return Err(ConfigError::invalid(
            "maps",
            "manifest_file",
            Some(config.maps.manifest_file.clone()),
            "not_a_file_name",
        ));
    }

    if !config.control_plane.base_url.starts_with("http://")
        && !config.control_plane.base_url.starts_with("https://")
    {
        return Err(ConfigError::invalid(
            "control_plane",
            "base_url",
            Some(config.control_plane.base_url.clone()),
            "unsupported_scheme",
        ));
    }

    let mut seen = HashSet::new();
    for (index, server) in config.servers.iter().enumerate() {
        validate_server(index, server)?;
        if !seen.insert(server.server_id.as_str()) {
            return Err(ConfigError::DuplicateServer {
                server_id: server.server_id.clone(),
            });
        }
    }

    Ok(())
}

fn validate_server(index: usize, server: &ServerConfig) -> ConfigResult<()> {
    let section = format!("servers[{index}]");
    let required = [
        ("server_id", server.server_id.as_str()),
        ("host", server.host.as_str()),
        ("username", server.username.as_str()),
        ("demos_dir", server.demos_dir.as_str()),
        ("maps_dir", server.maps_dir.as_str()),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::invalid(section, field, None, "empty"));
        }
    }
    if server.port == 0 {
        return Err(ConfigError::invalid(section, "port", Some("0".into()), "zero"));
    }
    if let Some(storage) = &server.storage {
        validate_storage(&format!("{section}.storage"), storage)?;
    }
    Ok(())
}

fn validate_storage(section: &str, storage: &StorageSettings) -> ConfigResult<()> {
    if storage.window_capacity == 0 {
        return Err(ConfigError::invalid(
            section,
            "window_capacity",
            Some("0".into()),
            "zero",
        ));
    }
    if storage.archive_batch_size == 0 {
        return Err(ConfigError::invalid(
            section,
            "archive_batch_size",
            Some("0".into()),
            "zero",
        ));
    }
    let dirs = [
        ("staging_dir", &storage.staging_dir),
        ("window_dir", &storage.window_dir),
        ("archive_dir", &storage.archive_dir),
    ];
    for (field, dir) in dirs {
        if dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid(section, field, None, "empty"));
        }
    }
    if storage.staging_dir == storage.window_dir
        || storage.staging_dir == storage.archive_dir
        || storage.window_dir == storage.archive_dir
    {
        return Err(ConfigError::invalid(
            section,
            "staging_dir",
            Some(storage.staging_dir.display().to_string()),
            "directories_must_differ",
        ));
    }
    Ok(())
}
