//! Configuration and file name builders.

use std::path::Path;

use chrono::{DateTime, Utc};
use demovault_config::{
    AppConfig, ControlPlaneSettings, DemoSettings, LoggingSettings, MapSettings, Secret,
    ServerConfig, StorageSettings,
};

/// Remote demo name carrying `at` as its creation timestamp.
#[must_use]
pub fn demo_name(at: DateTime<Utc>, label: &str) -> String {
    format!("{}_{label}.dem", at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Server whose demos live in `/demos` and map cache in `/maps`.
#[must_use]
pub fn server(server_id: &str) -> ServerConfig {
    ServerConfig {
        server_id: server_id.to_string(),
        host: format!("{server_id}.ftp.example"),
        port: 21,
        username: "ftp-user".into(),
        password: Secret::from("ftp-pass"),
        demos_dir: "/demos".into(),
        maps_dir: "/maps".into(),
        storage: None,
    }
}

/// Storage layout under `root` with the given limits.
#[must_use]
pub fn storage_in(root: &Path, window_capacity: usize, archive_batch_size: usize) -> StorageSettings {
    StorageSettings {
        staging_dir: root.join("staging"),
        window_dir: root.join("latest"),
        archive_dir: root.join("archive"),
        window_capacity,
        archive_batch_size,
    }
}

/// Demo settings accepting `.dem` files older than `min_age_minutes`.
#[must_use]
pub fn demo_settings(min_age_minutes: u64) -> DemoSettings {
    DemoSettings {
        enabled: true,
        interval_minutes: 5,
        min_age_minutes,
        allowed_extensions: vec![".dem".into()],
    }
}

/// Map settings with the default content layout and the given threshold.
#[must_use]
pub fn map_settings(min_size_mb: u64) -> MapSettings {
    MapSettings {
        enabled: true,
        interval_minutes: 60,
        min_size_mb,
        content_subdir: "content/730".into(),
        manifest_file: "appworkshop_730.acf".into(),
    }
}

/// Complete configuration rooted at `root` for `servers`.
#[must_use]
pub fn app_config(root: &Path, servers: Vec<ServerConfig>) -> AppConfig {
    AppConfig {
        logging: LoggingSettings::default(),
        storage: storage_in(root, 3, 10),
        demos: demo_settings(5),
        maps: map_settings(1000),
        control_plane: ControlPlaneSettings {
            base_url: "https://control.example/api/0.1".into(),
            username: "ops".into(),
            password: Secret::from("ops-pass"),
            request_timeout_secs: 5,
            stop_settle_secs: 0,
        },
        servers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn demo_name_uses_remote_timestamp_format() {
        let at = Utc
            .with_ymd_and_hms(2024, 2, 3, 4, 5, 6)
            .single()
            .unwrap_or_default();
        assert_eq!(demo_name(at, "mirage"), "2024-02-03_04-05-06_mirage.dem");
    }

    #[test]
    fn app_config_uses_shared_storage() {
        let config = app_config(Path::new("/tmp/dv"), vec![server("a")]);
        let storage = config.storage_for(&config.servers[0]);
        assert_eq!(storage.staging_dir, Path::new("/tmp/dv/staging"));
    }
}
