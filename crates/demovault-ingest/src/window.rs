//! Bounded directory holding uncompressed copies of the most recent demos.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{IngestError, IngestResult};
use crate::timestamp::timestamp_or_modified;
use crate::writer::TEMP_SUFFIX;

/// Outcome of offering a staged demo to the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowInsert {
    /// The demo was copied in, after evicting the oldest members until there was room.
    Copied {
        /// Members evicted to make room, oldest first.
        evicted: Vec<PathBuf>,
    },
    /// A member of that name already exists; nothing changed.
    AlreadyPresent,
}

/// Capacity-bounded recency buffer backed by a directory.
#[derive(Debug, Clone)]
pub struct LatestWindow {
    dir: PathBuf,
    capacity: usize,
}

impl LatestWindow {
    /// Window rooted at `dir` holding at most `capacity` demos.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            dir: dir.into(),
            capacity,
        }
    }

    /// Copy `staged` into the window, evicting the oldest members while at capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be listed, a member cannot be evicted, or
    /// the copy fails.
    pub fn insert(&self, staged: &Path) -> IngestResult<WindowInsert> {
        let Some(name) = staged.file_name() else {
            return Err(IngestError::InvalidInput {
                field: "staged_path",
                reason: "missing file name",
                value: Some(staged.display().to_string()),
            });
        };
        let target = self.dir.join(name);
        if target.exists() {
            info!(file = %target.display(), "demo already in latest window; skipping");
            return Ok(WindowInsert::AlreadyPresent);
        }

        fs::create_dir_all(&self.dir)
            .map_err(|source| IngestError::io("window.create_dir", &self.dir, source))?;

        let mut members = self.members()?;
        let mut evicted = Vec::new();
        while members.len() >= self.capacity.max(1) {
            let oldest = members.remove(0);
            fs::remove_file(&oldest.1)
                .map_err(|source| IngestError::io("window.evict", &oldest.1, source))?;
            info!(file = %oldest.1.display(), "evicted oldest demo from latest window");
            evicted.push(oldest.1);
        }

        if let Err(source) = fs::copy(staged, &target) {
            if let Err(err) = fs::remove_file(&target)
                && err.kind() != io::ErrorKind::NotFound
            {
                warn!(file = %target.display(), error = %err, "failed to remove partial window copy");
            }
            return Err(IngestError::io("window.copy", staged, source));
        }
        info!(file = %target.display(), "copied demo into latest window");
        Ok(WindowInsert::Copied { evicted })
    }

    /// Current members sorted oldest first (timestamp, then name).
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn members(&self) -> IngestResult<Vec<(DateTime<Utc>, PathBuf)>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(IngestError::io("window.read_dir", &self.dir, source)),
        };

        let mut members = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|source| IngestError::io("window.entry", &self.dir, source))?;
            let path = entry.path();
            let is_temp = path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().ends_with(TEMP_SUFFIX));
            if is_temp || !path.is_file() {
                continue;
            }
            members.push((timestamp_or_modified(&path), path));
        }
        members.sort();
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn stage(dir: &Path, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(name);
        fs::write(&path, name.as_bytes())?;
        Ok(path)
    }

    #[test]
    fn keeps_most_recent_members() -> Result<()> {
        let root = tempfile::tempdir()?;
        let staging = root.path().join("staging");
        let window = LatestWindow::new(root.path().join("latest"), 2);

        for name in [
            "2024-01-01_10-00-00_a.dem",
            "2024-01-01_11-00-00_b.dem",
            "2024-01-01_12-00-00_c.dem",
        ] {
            window.insert(&stage(&staging, name)?)?;
        }

        let names: Vec<_> = window
            .members()?
            .into_iter()
            .filter_map(|(_, path)| path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(
            names,
            vec!["2024-01-01_11-00-00_b.dem", "2024-01-01_12-00-00_c.dem"]
        );
        assert!(staging.join("2024-01-01_10-00-00_a.dem").exists());
        Ok(())
    }

    #[test]
    fn insertion_order_does_not_decide_eviction() -> Result<()> {
        let root = tempfile::tempdir()?;
        let staging = root.path().join("staging");
        let window = LatestWindow::new(root.path().join("latest"), 2);

        window.insert(&stage(&staging, "2024-01-01_12-00-00_new.dem")?)?;
        window.insert(&stage(&staging, "2024-01-01_08-00-00_old.dem")?)?;
        let outcome = window.insert(&stage(&staging, "2024-01-01_10-00-00_mid.dem")?)?;

        assert_eq!(
            outcome,
            WindowInsert::Copied {
                evicted: vec![root.path().join("latest/2024-01-01_08-00-00_old.dem")],
            }
        );
        Ok(())
    }

    #[test]
    fn ties_break_by_name() -> Result<()> {
        let root = tempfile::tempdir()?;
        let staging = root.path().join("staging");
        let window = LatestWindow::new(root.path().join("latest"), 1);

        window.insert(&stage(&staging, "2024-01-01_10-00-00_b.dem")?)?;
        window.insert(&stage(&staging, "2024-01-01_10-00-00_a.dem")?)?;
        let outcome = window.insert(&stage(&staging, "2024-01-01_10-00-00_c.dem")?)?;
        assert_eq!(
            outcome,
            WindowInsert::Copied {
                evicted: vec![root.path().join("latest/2024-01-01_10-00-00_a.dem")],
            }
        );
        assert_eq!(window.members()?.len(), 1);
        Ok(())
    }

    #[test]
    fn duplicate_name_is_skipped_without_eviction() -> Result<()> {
        let root = tempfile::tempdir()?;
        let staging = root.path().join("staging");
        let window = LatestWindow::new(root.path().join("latest"), 1);

        let staged = stage(&staging, "2024-01-01_10-00-00_a.dem")?;
        window.insert(&staged)?;
        assert_eq!(window.insert(&staged)?, WindowInsert::AlreadyPresent);
        assert_eq!(window.members()?.len(), 1);
        Ok(())
    }

    #[test]
    fn overfull_window_is_drained_to_capacity() -> Result<()> {
        let root = tempfile::tempdir()?;
        let latest = root.path().join("latest");
        for name in ["2024-01-01_01-00-00_a.dem", "2024-01-01_02-00-00_b.dem", "2024-01-01_03-00-00_c.dem"] {
            stage(&latest, name)?;
        }
        let window = LatestWindow::new(&latest, 2);
        let staged = stage(&root.path().join("staging"), "2024-01-01_04-00-00_d.dem")?;
        let WindowInsert::Copied { evicted } = window.insert(&staged)? else {
            anyhow::bail!("expected a copy");
        };
        assert_eq!(evicted.len(), 2);
        assert_eq!(window.members()?.len(), 2);
        Ok(())
    }
}
