//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers deserialised once at startup and shared read-only.
//! - Durations are stored as whole minutes/seconds in the document and exposed as
//!   [`Duration`] through accessors.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Root configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Logging output settings.
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Default local storage layout shared by servers without an override.
    pub storage: StorageSettings,
    /// Demo ingestion job settings.
    pub demos: DemoSettings,
    /// Map-cache pruning job settings.
    pub maps: MapSettings,
    /// Hosting control-plane client settings.
    pub control_plane: ControlPlaneSettings,
    /// Remote game servers processed by both jobs, in order.
    pub servers: Vec<ServerConfig>,
}

impl AppConfig {
    /// Storage layout that applies to the given server.
    #[must_use]
    pub fn storage_for<'a>(&'a self, server: &'a ServerConfig) -> &'a StorageSettings {
        server.storage.as_ref().unwrap_or(&self.storage)
    }
}

/// Logging level and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is not set.
    #[serde(default = "defaults::log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormatSetting,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            format: LogFormatSetting::default(),
        }
    }
}

/// Log output format selection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatSetting {
    /// Pick based on the build profile.
    #[default]
    Auto,
    /// Structured JSON lines.
    Json,
    /// Human-readable output.
    Pretty,
}

/// Local directories and retention limits for downloaded demos.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StorageSettings {
    /// Directory receiving freshly downloaded demos until they are archived.
    pub staging_dir: PathBuf,
    /// Directory holding uncompressed copies of the most recent demos.
    pub window_dir: PathBuf,
    /// Directory holding numbered zip batches.
    pub archive_dir: PathBuf,
    /// Maximum number of demos kept in the window directory.
    pub window_capacity: usize,
    /// Staging file count that triggers an archive batch.
    pub archive_batch_size: usize,
}

/// Demo ingestion job settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoSettings {
    /// Whether the ingestion job runs at all.
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
    /// Minutes between ingestion runs.
    #[serde(default = "defaults::demo_interval_minutes")]
    pub interval_minutes: u64,
    /// Minimum age, in minutes, of a demo before it is fetched.
    #[serde(default = "defaults::demo_min_age_minutes")]
    pub min_age_minutes: u64,
    /// File name endings accepted for download.
    #[serde(default = "defaults::allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl DemoSettings {
    /// Interval between ingestion runs.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    /// Minimum age before a demo is considered finished.
    #[must_use]
    pub const fn min_age(&self) -> Duration {
        Duration::from_secs(self.min_age_minutes.saturating_mul(60))
    }
}

/// Map-cache pruning job settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapSettings {
    /// Whether the map pruning job runs at all.
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
    /// Minutes between map pruning runs.
    #[serde(default = "defaults::map_interval_minutes")]
    pub interval_minutes: u64,
    /// Content size, in MiB, below which nothing is deleted.
    #[serde(default = "defaults::map_min_size_mb")]
    pub min_size_mb: u64,
    /// Content subtree below the server's maps directory.
    #[serde(default = "defaults::map_content_subdir")]
    pub content_subdir: String,
    /// Cache manifest file directly below the server's maps directory.
    #[serde(default = "defaults::map_manifest_file")]
    pub manifest_file: String,
}

impl MapSettings {
    /// Interval between map pruning runs.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    /// Size threshold in bytes.
    #[must_use]
    pub const fn min_size_bytes(&self) -> u64 {
        self.min_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Hosting control-plane client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlPlaneSettings {
    /// API base URL without a trailing slash.
    #[serde(default = "defaults::control_base_url")]
    pub base_url: String,
    /// Account user name used for basic authentication.
    pub username: String,
    /// Account password used for basic authentication.
    pub password: Secret,
    /// Per-request timeout in seconds.
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Pause after a successful stop request before touching files.
    #[serde(default = "defaults::stop_settle_secs")]
    pub stop_settle_secs: u64,
}

impl ControlPlaneSettings {
    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Delay applied after a stop request succeeds.
    #[must_use]
    pub const fn stop_settle(&self) -> Duration {
        Duration::from_secs(self.stop_settle_secs)
    }
}

/// One remote game server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Control-plane identifier of the server.
    pub server_id: String,
    /// File transport host.
    pub host: String,
    /// File transport port.
    #[serde(default = "defaults::ftp_port")]
    pub port: u16,
    /// File transport user name.
    pub username: String,
    /// File transport password.
    pub password: Secret,
    /// Remote directory the server writes demos into.
    pub demos_dir: String,
    /// Remote directory holding the map cache.
    pub maps_dir: String,
    /// Optional storage layout private to this server.
    #[serde(default)]
    pub storage: Option<StorageSettings>,
}

/// Credential string that never renders its value in debug output.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a plaintext secret.
    #[must_use]
    pub const fn new(value: String) -> Self {
        Self(value)
    }

    /// Access the plaintext value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(root: &str) -> StorageSettings {
        StorageSettings {
            staging_dir: PathBuf::from(root).join("staging"),
            window_dir: PathBuf::from(root).join("latest"),
            archive_dir: PathBuf::from(root).join("archive"),
            window_capacity: 3,
            archive_batch_size: 10,
        }
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = Secret::from("hunter2");
        assert_eq!(format!("{secret:?}"), "Secret(***)");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn durations_convert_from_minutes() {
        let demos = DemoSettings {
            enabled: true,
            interval_minutes: 2,
            min_age_minutes: 7,
            allowed_extensions: vec![".dem".into()],
        };
        assert_eq!(demos.interval(), Duration::from_secs(120));
        assert_eq!(demos.min_age(), Duration::from_secs(420));
    }

    #[test]
    fn min_size_bytes_uses_mebibytes() {
        let maps = MapSettings {
            enabled: true,
            interval_minutes: 60,
            min_size_mb: 3,
            content_subdir: "content/730".into(),
            manifest_file: "appworkshop_730.acf".into(),
        };
        assert_eq!(maps.min_size_bytes(), 3 * 1024 * 1024);
    }

    #[test]
    fn storage_for_prefers_server_override() {
        let shared = storage("/srv/shared");
        let private = storage("/srv/private");
        let mut server = ServerConfig {
            server_id: "abc".into(),
            host: "ftp.example".into(),
            port: 21,
            username: "user".into(),
            password: Secret::from("pw"),
            demos_dir: "/demos".into(),
            maps_dir: "/maps".into(),
            storage: None,
        };
        let config = AppConfig {
            logging: LoggingSettings::default(),
            storage: shared.clone(),
            demos: DemoSettings {
                enabled: true,
                interval_minutes: 5,
                min_age_minutes: 5,
                allowed_extensions: vec![".dem".into()],
            },
            maps: MapSettings {
                enabled: true,
                interval_minutes: 60,
                min_size_mb: 1000,
                content_subdir: "content/730".into(),
                manifest_file: "appworkshop_730.acf".into(),
            },
            control_plane: ControlPlaneSettings {
                base_url: "https://control.example".into(),
                username: "ops".into(),
                password: Secret::from("pw"),
                request_timeout_secs: 30,
                stop_settle_secs: 2,
            },
            servers: Vec::new(),
        };

        assert_eq!(config.storage_for(&server), &shared);
        server.storage = Some(private.clone());
        assert_eq!(config.storage_for(&server), &private);
    }
}
