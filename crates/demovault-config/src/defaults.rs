//! Serde defaults for optional configuration fields.
//!
//! # Design
//! - Keep every default in one place so the YAML schema stays auditable.

pub(crate) const fn enabled() -> bool {
    true
}

pub(crate) fn log_level() -> String {
    "info".to_string()
}

pub(crate) const fn ftp_port() -> u16 {
    21
}

pub(crate) const fn demo_interval_minutes() -> u64 {
    5
}

pub(crate) const fn demo_min_age_minutes() -> u64 {
    5
}

pub(crate) fn allowed_extensions() -> Vec<String> {
    vec![".dem".to_string()]
}

pub(crate) const fn map_interval_minutes() -> u64 {
    60
}

pub(crate) const fn map_min_size_mb() -> u64 {
    1000
}

pub(crate) fn map_content_subdir() -> String {
    "content/730".to_string()
}

pub(crate) fn map_manifest_file() -> String {
    "appworkshop_730.acf".to_string()
}

pub(crate) fn control_base_url() -> String {
    "https://dathost.net/api/0.1".to_string()
}

pub(crate) const fn request_timeout_secs() -> u64 {
    30
}

pub(crate) const fn stop_settle_secs() -> u64 {
    2
}
