//! Creation timestamps embedded in demo file names.
//!
//! Names start with `yyyy-MM-dd_HH-mm-ss_`, read as UTC. When a name does not parse,
//! ingestion treats the file as created "now" and window eviction uses the local
//! modification time instead. Both fallbacks are logged at `warn` because a malformed
//! name can silently reorder eviction.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

/// `chrono` format of the first two `_`-separated name tokens.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Parse the creation timestamp from a demo file name.
#[must_use]
pub fn parse_name_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let mut tokens = name.split('_');
    let date = tokens.next()?;
    let time = tokens.next()?;
    NaiveDateTime::parse_from_str(&format!("{date}_{time}"), TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Timestamp from the name, or `now` when the name does not carry one.
#[must_use]
pub fn timestamp_or_now(name: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    parse_name_timestamp(name).unwrap_or_else(|| {
        warn!(file = name, "failed to parse timestamp from file name; using current time");
        now
    })
}

/// Timestamp from the file name, or the file's modification time.
///
/// Falls back to the current time only when the modification time is unavailable.
#[must_use]
pub fn timestamp_or_modified(path: &Path) -> DateTime<Utc> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Some(parsed) = parse_name_timestamp(&name) {
        return parsed;
    }
    warn!(
        file = %path.display(),
        "failed to parse timestamp from file name; using modification time"
    );
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_or_else(|_| Utc::now(), DateTime::<Utc>::from)
}
