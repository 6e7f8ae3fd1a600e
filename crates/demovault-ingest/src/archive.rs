//! Numbered zip batches of staged demos.
//!
//! # Design
//! - Batches are named `{left}-{right}.zip` where the range counts demos archived so
//!   far; the next `left` is the highest existing `right` plus one.
//! - The archive is written as `<name>.tmp`, finished, synced and renamed; originals are
//!   deleted only after the rename.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{IngestError, IngestResult};
use crate::writer::{TEMP_SUFFIX, temp_path_for};

/// Inclusive range of demo ordinals covered by one archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArchiveRange {
    /// First ordinal in the batch.
    pub left: u64,
    /// Last ordinal in the batch.
    pub right: u64,
}

impl ArchiveRange {
    /// Parse `{left}-{right}.zip`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let captures = archive_name_pattern()?.captures(name)?;
        let left = captures.get(1)?.as_str().parse().ok()?;
        let right = captures.get(2)?.as_str().parse().ok()?;
        Some(Self { left, right })
    }

    /// Archive file name for the range.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}-{}.zip", self.left, self.right)
    }

    /// Number of demos covered.
    #[must_use]
    pub const fn len(self) -> u64 {
        self.right.saturating_sub(self.left).saturating_add(1)
    }

    /// Always false; ranges hold at least one demo.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        false
    }
}

fn archive_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d+)-(\d+)\.zip$").ok())
        .as_ref()
}

/// A written archive batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveBatch {
    /// Range encoded in the archive name.
    pub range: ArchiveRange,
    /// Final archive path.
    pub path: PathBuf,
    /// Entry names in archive order.
    pub entries: Vec<String>,
}

/// Rotates the staging directory into numbered archives.
#[derive(Debug, Clone)]
pub struct ArchiveBatcher {
    staging_dir: PathBuf,
    archive_dir: PathBuf,
    batch_size: usize,
}

impl ArchiveBatcher {
    /// Batcher moving files from `staging_dir` into `archive_dir` once `batch_size`
    /// files have accumulated.
    #[must_use]
    pub fn new(
        staging_dir: impl Into<PathBuf>,
        archive_dir: impl Into<PathBuf>,
        batch_size: usize,
    ) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            archive_dir: archive_dir.into(),
            batch_size,
        }
    }

    /// Remove leftover `*.zip.tmp` archives from an interrupted run.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive directory exists but cannot be read.
    pub fn prepare(&self) -> IngestResult<usize> {
        crate::writer::purge_temp_artifacts(&self.archive_dir)
    }

    /// Range the next archive of `count` demos would receive.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive directory cannot be read.
    pub fn next_range(&self, count: usize) -> IngestResult<ArchiveRange> {
        let entries = match fs::read_dir(&self.archive_dir) {
            Ok(entries) => Some(entries),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(IngestError::io("archive.read_dir", &self.archive_dir, source));
            }
        };

        let mut highest = 0_u64;
        for entry in entries.into_iter().flatten() {
            let entry = entry
                .map_err(|source| IngestError::io("archive.entry", &self.archive_dir, source))?;
            if !entry.file_type().is_ok_and(|kind| kind.is_file()) {
                continue;
            }
            if let Some(range) = ArchiveRange::parse(&entry.file_name().to_string_lossy()) {
                highest = highest.max(range.right);
            }
        }

        let left = highest.saturating_add(1);
        let count = u64::try_from(count).unwrap_or(u64::MAX).max(1);
        Ok(ArchiveRange {
            left,
            right: left.saturating_add(count - 1),
        })
    }

    /// Archive every staged demo when the batch ceiling is reached.
    ///
    /// Returns `None` when fewer than `batch_size` files are staged.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be written or renamed; the staged files
    /// are then left untouched and the temp archive is removed.
    pub fn rotate_if_full(&self) -> IngestResult<Option<ArchiveBatch>> {
        let staged = self.staged_files()?;
        if staged.len() < self.batch_size.max(1) {
            return Ok(None);
        }

        fs::create_dir_all(&self.archive_dir)
            .map_err(|source| IngestError::io("archive.create_dir", &self.archive_dir, source))?;
        let range = self.next_range(staged.len())?;
        let final_path = self.archive_dir.join(range.file_name());
        let temp_path = temp_path_for(&final_path);

        let entries = match write_archive(&temp_path, &staged).and_then(|entries| {
            fs::rename(&temp_path, &final_path)
                .map_err(|source| IngestError::io("archive.rename", &final_path, source))?;
            Ok(entries)
        }) {
            Ok(entries) => entries,
            Err(err) => {
                if let Err(remove_err) = fs::remove_file(&temp_path)
                    && remove_err.kind() != io::ErrorKind::NotFound
                {
                    warn!(
                        path = %temp_path.display(),
                        error = %remove_err,
                        "failed to remove incomplete archive"
                    );
                }
                return Err(err);
            }
        };

        for path in &staged {
            if let Err(err) = fs::remove_file(path) {
                warn!(file = %path.display(), error = %err, "failed to delete archived demo");
            }
        }
        info!(
            archive = %final_path.display(),
            demos = entries.len(),
            "archived staged demos"
        );
        Ok(Some(ArchiveBatch {
            range,
            path: final_path,
            entries,
        }))
    }

    fn staged_files(&self) -> IngestResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.staging_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(IngestError::io("archive.scan", &self.staging_dir, source));
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|source| IngestError::io("archive.scan", &self.staging_dir, source))?;
            let path = entry.path();
            let is_temp = path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().ends_with(TEMP_SUFFIX));
            if !is_temp && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn write_archive(temp_path: &Path, staged: &[PathBuf]) -> IngestResult<Vec<String>> {
    let file = File::create(temp_path)
        .map_err(|source| IngestError::io("archive.create", temp_path, source))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = Vec::with_capacity(staged.len());
    for path in staged {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        zip.start_file(name.as_str(), options)
            .map_err(|source| IngestError::zip("archive.start_file", temp_path, source))?;
        let mut input =
            File::open(path).map_err(|source| IngestError::io("archive.open", path, source))?;
        io::copy(&mut input, &mut zip)
            .map_err(|source| IngestError::io("archive.write", temp_path, source))?;
        entries.push(name);
    }

    let writer = zip
        .finish()
        .map_err(|source| IngestError::zip("archive.finish", temp_path, source))?;
    let file = writer
        .into_inner()
        .map_err(|err| IngestError::io("archive.flush", temp_path, err.into_error()))?;
    file.sync_all()
        .map_err(|source| IngestError::io("archive.sync", temp_path, source))?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Read;

    fn stage(dir: &Path, names: &[&str]) -> Result<()> {
        fs::create_dir_all(dir)?;
        for name in names {
            fs::write(dir.join(name), name.as_bytes())?;
        }
        Ok(())
    }

    #[test]
    fn parses_archive_names() {
        assert_eq!(
            ArchiveRange::parse("4-6.zip"),
            Some(ArchiveRange { left: 4, right: 6 })
        );
        assert_eq!(ArchiveRange::parse("4-6.zip.tmp"), None);
        assert_eq!(ArchiveRange::parse("a-6.zip"), None);
        assert_eq!(ArchiveRange { left: 4, right: 6 }.len(), 3);
    }

    #[test]
    fn below_ceiling_does_nothing() -> Result<()> {
        let root = tempfile::tempdir()?;
        let staging = root.path().join("staging");
        stage(&staging, &["a.dem", "b.dem"])?;
        fs::write(staging.join("c.dem.tmp"), b"partial")?;
        let batcher = ArchiveBatcher::new(&staging, root.path().join("archive"), 3);
        assert_eq!(batcher.rotate_if_full()?, None);
        assert!(staging.join("a.dem").exists());
        Ok(())
    }

    #[test]
    fn consecutive_batches_are_contiguous() -> Result<()> {
        let root = tempfile::tempdir()?;
        let staging = root.path().join("staging");
        let archive = root.path().join("archive");
        let batcher = ArchiveBatcher::new(&staging, &archive, 3);

        stage(&staging, &["a.dem", "b.dem", "c.dem"])?;
        let first = batcher.rotate_if_full()?;
        assert_eq!(first.map(|batch| batch.range), Some(ArchiveRange { left: 1, right: 3 }));

        stage(&staging, &["d.dem", "e.dem", "f.dem"])?;
        let second = batcher.rotate_if_full()?;
        assert_eq!(second.map(|batch| batch.range), Some(ArchiveRange { left: 4, right: 6 }));

        assert!(archive.join("1-3.zip").is_file());
        assert!(archive.join("4-6.zip").is_file());
        assert_eq!(fs::read_dir(&staging)?.count(), 0);

        let mut zip = zip::ZipArchive::new(File::open(archive.join("4-6.zip"))?)?;
        let mut body = String::new();
        zip.by_name("e.dem")?.read_to_string(&mut body)?;
        assert_eq!(body, "e.dem");
        Ok(())
    }

    #[test]
    fn next_range_follows_highest_right() -> Result<()> {
        let root = tempfile::tempdir()?;
        let archive = root.path().join("archive");
        fs::create_dir_all(&archive)?;
        fs::write(archive.join("1-10.zip"), b"")?;
        fs::write(archive.join("11-12.zip"), b"")?;
        fs::write(archive.join("notes.txt"), b"")?;
        let batcher = ArchiveBatcher::new(root.path().join("staging"), &archive, 5);
        assert_eq!(batcher.next_range(5)?, ArchiveRange { left: 13, right: 17 });
        Ok(())
    }

    #[test]
    fn failed_archive_keeps_originals() -> Result<()> {
        let root = tempfile::tempdir()?;
        let staging = root.path().join("staging");
        let archive = root.path().join("archive");
        stage(&staging, &["a.dem", "b.dem"])?;
        fs::write(&archive, b"not a directory")?;

        let batcher = ArchiveBatcher::new(&staging, &archive, 2);
        assert!(batcher.rotate_if_full().is_err());
        assert!(staging.join("a.dem").exists());
        assert!(staging.join("b.dem").exists());
        Ok(())
    }

    #[test]
    fn rename_failure_discards_temp_archive() -> Result<()> {
        let root = tempfile::tempdir()?;
        let staging = root.path().join("staging");
        let archive = root.path().join("archive");
        stage(&staging, &["a.dem"])?;
        // A directory named like the next archive makes the rename fail.
        fs::create_dir_all(archive.join("1-1.zip"))?;
        fs::write(archive.join("1-1.zip").join("keep"), b"x")?;

        let batcher = ArchiveBatcher::new(&staging, &archive, 1);
        assert!(batcher.rotate_if_full().is_err());
        assert!(!archive.join("1-1.zip.tmp").exists());
        assert!(staging.join("a.dem").exists());
        Ok(())
    }
}
