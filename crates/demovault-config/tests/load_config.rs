use std::fs;

use demovault_config::{ConfigError, LogFormatSetting, load_from_path};

const DOCUMENT: &str = r"
logging:
  level: debug
  format: json
storage:
  staging_dir: /var/lib/demovault/staging
  window_dir: /var/lib/demovault/latest
  archive_dir: /var/lib/demovault/archive
  window_capacity: 10
  archive_batch_size: 50
demos:
  enabled: true
  interval_minutes: 5
  min_age_minutes: 10
  allowed_extensions: ['.dem']
maps:
  enabled: false
  min_size_mb: 2048
control_plane:
  username: ops@example.net
  password: hunter2
  request_timeout_secs: 15
servers:
  - server_id: 5f0c1a
    host: ams.example.net
    port: 2121
    username: 5f0c1a
    password: ftp-pass
    demos_dir: /demos
    maps_dir: /steamapps/workshop
";

#[test]
fn loads_and_validates_document_from_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("demovault.yaml");
    fs::write(&path, DOCUMENT)?;

    let config = load_from_path(&path)?;
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormatSetting::Json);
    assert_eq!(config.demos.min_age_minutes, 10);
    assert!(!config.maps.enabled);
    assert_eq!(config.maps.min_size_mb, 2048);
    assert_eq!(config.control_plane.request_timeout_secs, 15);
    assert_eq!(config.servers.len(), 1);
    assert_eq!(config.servers[0].port, 2121);
    assert_eq!(config.servers[0].password.expose(), "ftp-pass");
    Ok(())
}

#[test]
fn rejects_invalid_document_from_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("demovault.yaml");
    fs::write(&path, DOCUMENT.replace("window_capacity: 10", "window_capacity: 0"))?;

    let err = load_from_path(&path).err().ok_or_else(|| anyhow::anyhow!("expected error"))?;
    assert!(matches!(err, ConfigError::InvalidField { .. }));
    Ok(())
}

#[test]
fn reports_parse_errors_with_path() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("demovault.yaml");
    fs::write(&path, "storage: [")?;

    match load_from_path(&path) {
        Err(ConfigError::Parse { path: Some(reported), .. }) => assert_eq!(reported, path),
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}
