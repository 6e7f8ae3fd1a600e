//! Write-then-rename staging of downloaded files.
//!
//! A file becomes visible under its final name only through a rename of a fully
//! written and synced `<final>.tmp`. Any failure removes the temp artifact.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{IngestError, IngestResult};

/// Suffix marking in-flight artifacts.
pub const TEMP_SUFFIX: &str = ".tmp";

/// `<path>.tmp` for the given final path.
#[must_use]
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Fill `<final_path>.tmp` through `fill` and rename it to `final_path` on success.
///
/// Returns the byte count reported by `fill`.
///
/// # Errors
///
/// Returns the error from `fill`, or an IO error from create/flush/sync/rename. The
/// temp artifact is removed in every error case and `final_path` is left untouched.
pub fn write_atomically<F>(final_path: &Path, fill: F) -> IngestResult<u64>
where
    F: FnOnce(&mut dyn Write) -> IngestResult<u64>,
{
    let temp_path = temp_path_for(final_path);
    let result = write_temp(&temp_path, fill).and_then(|written| {
        fs::rename(&temp_path, final_path)
            .map_err(|source| IngestError::io("stage.rename", final_path, source))?;
        Ok(written)
    });

    if result.is_err() {
        discard(&temp_path);
    }
    result
}

fn write_temp<F>(temp_path: &Path, fill: F) -> IngestResult<u64>
where
    F: FnOnce(&mut dyn Write) -> IngestResult<u64>,
{
    let file = File::create(temp_path)
        .map_err(|source| IngestError::io("stage.create", temp_path, source))?;
    let mut writer = BufWriter::new(file);
    let written = fill(&mut writer)?;
    let file = writer
        .into_inner()
        .map_err(|err| IngestError::io("stage.flush", temp_path, err.into_error()))?;
    file.sync_all()
        .map_err(|source| IngestError::io("stage.sync", temp_path, source))?;
    Ok(written)
}

fn discard(temp_path: &Path) {
    match fs::remove_file(temp_path) {
        Ok(()) => info!(path = %temp_path.display(), "removed incomplete temporary file"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            path = %temp_path.display(),
            error = %err,
            "failed to remove incomplete temporary file"
        ),
    }
}

/// Delete every `*.tmp` file left in `dir` by an interrupted run.
///
/// A missing directory is not an error; it simply holds no artifacts.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be read.
pub fn purge_temp_artifacts(dir: &Path) -> IngestResult<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(dir = %dir.display(), "directory does not exist; nothing to purge");
            return Ok(0);
        }
        Err(source) => return Err(IngestError::io("purge.read_dir", dir, source)),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|source| IngestError::io("purge.entry", dir, source))?;
        let path = entry.path();
        let is_temp = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(TEMP_SUFFIX));
        if !is_temp || !path.is_file() {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                removed += 1;
                info!(path = %path.display(), "deleted leftover temporary file");
            }
            Err(err) => warn!(
                path = %path.display(),
                error = %err,
                "failed to delete leftover temporary file"
            ),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn temp_path_appends_suffix() {
        assert_eq!(
            temp_path_for(Path::new("/staging/a.dem")),
            PathBuf::from("/staging/a.dem.tmp")
        );
    }

    #[test]
    fn successful_write_is_renamed() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("2024-01-01_00-00-00_a.dem");
        let written = write_atomically(&target, |sink| {
            sink.write_all(b"demo-bytes")
                .map_err(|source| IngestError::io("test.write", "sink", source))?;
            Ok(10)
        })?;
        assert_eq!(written, 10);
        assert_eq!(fs::read(&target)?, b"demo-bytes");
        assert!(!temp_path_for(&target).exists());
        Ok(())
    }

    #[test]
    fn failure_at_any_offset_never_exposes_final_name() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let payload = vec![7_u8; 64 * 1024 + 3];
        for offset in [0, 1, 4096, 8192, 64 * 1024, payload.len() - 1] {
            let target = dir.path().join(format!("partial-{offset}.dem"));
            let result = write_atomically(&target, |sink| {
                sink.write_all(&payload[..offset])
                    .map_err(|source| IngestError::io("test.write", "sink", source))?;
                Err(IngestError::InvalidInput {
                    field: "transfer",
                    reason: "interrupted",
                    value: Some(offset.to_string()),
                })
            });
            assert!(result.is_err());
            assert!(!target.exists(), "final file visible after failure at {offset}");
            assert!(!temp_path_for(&target).exists());
        }
        Ok(())
    }

    #[test]
    fn rename_failure_removes_temp() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("occupied.dem");
        fs::create_dir(&target)?;
        fs::write(target.join("keep"), b"x")?;

        let result = write_atomically(&target, |sink| {
            sink.write_all(b"abc")
                .map_err(|source| IngestError::io("test.write", "sink", source))?;
            Ok(3)
        });
        assert!(matches!(
            result,
            Err(IngestError::Io {
                operation: "stage.rename",
                ..
            })
        ));
        assert!(target.is_dir());
        assert!(!temp_path_for(&target).exists());
        Ok(())
    }

    #[test]
    fn purge_removes_only_temp_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("a.dem"), b"a")?;
        fs::write(dir.path().join("b.dem.tmp"), b"b")?;
        fs::write(dir.path().join("c.zip.tmp"), b"c")?;

        assert_eq!(purge_temp_artifacts(dir.path())?, 2);
        assert!(dir.path().join("a.dem").exists());
        assert!(!dir.path().join("b.dem.tmp").exists());
        assert_eq!(purge_temp_artifacts(&dir.path().join("missing"))?, 0);
        Ok(())
    }
}
