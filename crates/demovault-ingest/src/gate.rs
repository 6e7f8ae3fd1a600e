//! Decide which remote demos are finished and not yet staged.
//!
//! # Design
//! - Evaluation is side-effect free; the only mutation is [`IngestGate::prepare`], which
//!   purges temp artifacts left by an interrupted run before any file is evaluated.
//! - A timestamp in the future yields a negative age and is deferred like a young file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use demovault_config::{DemoSettings, StorageSettings};
use tracing::debug;

use crate::error::IngestResult;
use crate::timestamp::timestamp_or_now;
use crate::writer::purge_temp_artifacts;

/// Why a remote file was left in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The name does not end with an allowed extension.
    Extension,
    /// The name is not a bare file name.
    InvalidName,
    /// The file is younger than the configured minimum age.
    TooYoung,
    /// A file of that name is already staged.
    AlreadyStaged,
    /// A file of that name is already in the latest window.
    AlreadyInWindow,
}

impl RejectReason {
    /// Label used in metrics and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Extension => "extension",
            Self::InvalidName => "invalid_name",
            Self::TooYoung => "too_young",
            Self::AlreadyStaged => "already_staged",
            Self::AlreadyInWindow => "already_in_window",
        }
    }
}

/// Outcome of evaluating one remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Download the file to `staged_path`.
    Accept {
        /// Creation time used for the age check.
        created_at: DateTime<Utc>,
        /// Final local path in the staging directory.
        staged_path: PathBuf,
    },
    /// Leave the file on the remote side for now.
    Reject(RejectReason),
}

/// Readiness and idempotency gate for one server's staging layout.
#[derive(Debug, Clone)]
pub struct IngestGate {
    allowed_extensions: Vec<String>,
    min_age: TimeDelta,
    staging_dir: PathBuf,
    window_dir: PathBuf,
}

impl IngestGate {
    /// Build a gate from the demo settings and the server's storage layout.
    #[must_use]
    pub fn new(demos: &DemoSettings, storage: &StorageSettings) -> Self {
        Self::with_rules(
            demos.allowed_extensions.clone(),
            demos.min_age(),
            &storage.staging_dir,
            &storage.window_dir,
        )
    }

    /// Build a gate from explicit rules.
    #[must_use]
    pub fn with_rules(
        allowed_extensions: Vec<String>,
        min_age: Duration,
        staging_dir: &Path,
        window_dir: &Path,
    ) -> Self {
        Self {
            allowed_extensions,
            min_age: TimeDelta::from_std(min_age).unwrap_or(TimeDelta::MAX),
            staging_dir: staging_dir.to_path_buf(),
            window_dir: window_dir.to_path_buf(),
        }
    }

    /// Remove leftover `*.tmp` artifacts from the staging directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the staging directory exists but cannot be read.
    pub fn prepare(&self) -> IngestResult<usize> {
        purge_temp_artifacts(&self.staging_dir)
    }

    /// Evaluate a remote file name against the gate at time `now`.
    #[must_use]
    pub fn evaluate(&self, name: &str, now: DateTime<Utc>) -> GateDecision {
        if !self.has_allowed_extension(name) {
            return GateDecision::Reject(RejectReason::Extension);
        }
        if !is_bare_name(name) {
            return GateDecision::Reject(RejectReason::InvalidName);
        }

        let created_at = timestamp_or_now(name, now);
        let age = now.signed_duration_since(created_at);
        if age < self.min_age {
            debug!(file = name, age_secs = age.num_seconds(), "demo not old enough yet");
            return GateDecision::Reject(RejectReason::TooYoung);
        }

        let staged_path = self.staging_dir.join(name);
        if staged_path.exists() {
            return GateDecision::Reject(RejectReason::AlreadyStaged);
        }
        if self.window_dir.join(name).exists() {
            return GateDecision::Reject(RejectReason::AlreadyInWindow);
        }

        GateDecision::Accept {
            created_at,
            staged_path,
        }
    }

    fn has_allowed_extension(&self, name: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|extension| name.ends_with(extension.as_str()))
    }
}

fn is_bare_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::TimeZone;
    use std::fs;

    fn gate(root: &Path, min_age_minutes: u64) -> IngestGate {
        IngestGate::with_rules(
            vec![".dem".into()],
            Duration::from_secs(min_age_minutes * 60),
            &root.join("staging"),
            &root.join("latest"),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn accepts_old_enough_demo() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let gate = gate(dir.path(), 5);
        let decision = gate.evaluate("2024-05-01_11-50-00_match.dem", now());
        assert_eq!(
            decision,
            GateDecision::Accept {
                created_at: Utc
                    .with_ymd_and_hms(2024, 5, 1, 11, 50, 0)
                    .single()
                    .unwrap_or_default(),
                staged_path: dir.path().join("staging/2024-05-01_11-50-00_match.dem"),
            }
        );
        Ok(())
    }

    #[test]
    fn rejects_wrong_extension_and_young_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let gate = gate(dir.path(), 5);
        assert_eq!(
            gate.evaluate("2024-05-01_11-00-00_match.txt", now()),
            GateDecision::Reject(RejectReason::Extension)
        );
        assert_eq!(
            gate.evaluate("2024-05-01_11-58-00_match.dem", now()),
            GateDecision::Reject(RejectReason::TooYoung)
        );
        assert_eq!(
            gate.evaluate("2024-05-02_00-00-00_future.dem", now()),
            GateDecision::Reject(RejectReason::TooYoung)
        );
        assert_eq!(
            gate.evaluate("../escape.dem", now()),
            GateDecision::Reject(RejectReason::InvalidName)
        );
        Ok(())
    }

    #[test]
    fn unparsable_name_is_treated_as_brand_new() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert_eq!(
            gate(dir.path(), 5).evaluate("match.dem", now()),
            GateDecision::Reject(RejectReason::TooYoung)
        );
        assert!(matches!(
            gate(dir.path(), 0).evaluate("match.dem", now()),
            GateDecision::Accept { created_at, .. } if created_at == now()
        ));
        Ok(())
    }

    #[test]
    fn existing_copies_make_gate_idempotent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let gate = gate(dir.path(), 0);
        fs::create_dir_all(dir.path().join("staging"))?;
        fs::create_dir_all(dir.path().join("latest"))?;
        fs::write(dir.path().join("staging/a.dem"), b"a")?;
        fs::write(dir.path().join("latest/b.dem"), b"b")?;

        assert_eq!(
            gate.evaluate("a.dem", now()),
            GateDecision::Reject(RejectReason::AlreadyStaged)
        );
        assert_eq!(
            gate.evaluate("b.dem", now()),
            GateDecision::Reject(RejectReason::AlreadyInWindow)
        );
        Ok(())
    }

    #[test]
    fn prepare_purges_staging_temp_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let staging = dir.path().join("staging");
        fs::create_dir_all(&staging)?;
        fs::write(staging.join("a.dem.tmp"), b"partial")?;
        assert_eq!(gate(dir.path(), 0).prepare()?, 1);
        assert!(!staging.join("a.dem.tmp").exists());
        Ok(())
    }
}
