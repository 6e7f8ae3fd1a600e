//! Per-server ingestion pipeline.
//!
//! list → gate → atomic write → latest window → archive rotation → remote delete.
//!
//! # Design
//! - Only a listing failure aborts the server; every per-file failure is logged, counted
//!   and the run moves on to the next file.
//! - Once a demo is durably staged its remote copy is deleted even if the window copy or
//!   archive rotation failed, since the staged file is the authoritative local copy.
//! - A demo the gate finds already held locally is not downloaded again, but its remote
//!   copy is still deleted. A delete that failed on an earlier run is retried this way.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use demovault_config::{DemoSettings, ServerConfig, StorageSettings};
use demovault_remote::{RemoteFileSource, join};
use demovault_telemetry::Metrics;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveBatcher, ArchiveRange};
use crate::error::{IngestError, IngestResult};
use crate::gate::{GateDecision, IngestGate, RejectReason};
use crate::window::{LatestWindow, WindowInsert};
use crate::writer::write_atomically;

/// Summary of one server's ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Names returned by the remote listing.
    pub listed: usize,
    /// Demos staged during the run.
    pub ingested: usize,
    /// Demos left in place by the gate.
    pub skipped: usize,
    /// Demos whose download failed.
    pub failed: usize,
    /// Window members evicted.
    pub evicted: usize,
    /// Archive batches written.
    pub archives: Vec<ArchiveRange>,
    /// Remote copies deleted after staging.
    pub remote_deleted: usize,
    /// Remote deletes that failed.
    pub remote_delete_failures: usize,
}

/// Runs the ingestion pipeline against one server session at a time.
#[derive(Clone)]
pub struct IngestService {
    demos: DemoSettings,
    metrics: Metrics,
}

impl IngestService {
    /// Service applying `demos` rules and recording into `metrics`.
    #[must_use]
    pub const fn new(demos: DemoSettings, metrics: Metrics) -> Self {
        Self { demos, metrics }
    }

    /// Ingest every ready demo of `server` using the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the local directories cannot be prepared or the remote demo
    /// directory cannot be listed.
    pub fn run(
        &self,
        server: &ServerConfig,
        storage: &StorageSettings,
        source: &mut dyn RemoteFileSource,
    ) -> IngestResult<IngestReport> {
        self.run_at(server, storage, source, Utc::now())
    }

    /// Ingest every demo of `server` that is ready at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the local directories cannot be prepared or the remote demo
    /// directory cannot be listed.
    pub fn run_at(
        &self,
        server: &ServerConfig,
        storage: &StorageSettings,
        source: &mut dyn RemoteFileSource,
        now: DateTime<Utc>,
    ) -> IngestResult<IngestReport> {
        ensure_dir(&storage.staging_dir)?;
        ensure_dir(&storage.window_dir)?;

        let gate = IngestGate::new(&self.demos, storage);
        let window = LatestWindow::new(&storage.window_dir, storage.window_capacity);
        let batcher = ArchiveBatcher::new(
            &storage.staging_dir,
            &storage.archive_dir,
            storage.archive_batch_size,
        );

        let purged = gate.prepare()? + batcher.prepare()?;
        if purged > 0 {
            info!(server_id = %server.server_id, purged, "purged leftover temporary files");
        }

        let mut names = source
            .list_names(&server.demos_dir)
            .map_err(|err| IngestError::remote("list", &server.demos_dir, err))?;
        names.sort();

        let mut report = IngestReport {
            listed: names.len(),
            ..IngestReport::default()
        };
        for name in &names {
            match gate.evaluate(name, now) {
                GateDecision::Reject(reason) => {
                    debug!(server_id = %server.server_id, file = %name, reason = reason.as_str(), "skipping demo");
                    self.metrics.inc_demo_skipped(reason.as_str());
                    report.skipped += 1;
                    if matches!(
                        reason,
                        RejectReason::AlreadyStaged | RejectReason::AlreadyInWindow
                    ) {
                        let remote_path = join(&server.demos_dir, name);
                        self.delete_remote(server, source, &remote_path, &mut report);
                    }
                }
                GateDecision::Accept { staged_path, .. } => {
                    let remote_path = join(&server.demos_dir, name);
                    self.ingest_one(
                        server,
                        source,
                        &remote_path,
                        &staged_path,
                        &window,
                        &batcher,
                        &mut report,
                    );
                }
            }
        }

        info!(
            server_id = %server.server_id,
            listed = report.listed,
            ingested = report.ingested,
            skipped = report.skipped,
            failed = report.failed,
            archives = report.archives.len(),
            "demo ingestion finished"
        );
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn ingest_one(
        &self,
        server: &ServerConfig,
        source: &mut dyn RemoteFileSource,
        remote_path: &str,
        staged_path: &Path,
        window: &LatestWindow,
        batcher: &ArchiveBatcher,
        report: &mut IngestReport,
    ) {
        let staged = write_atomically(staged_path, |sink| {
            source
                .retrieve(remote_path, sink)
                .map_err(|err| IngestError::remote("retrieve", remote_path, err))
        });
        match staged {
            Ok(bytes) => {
                info!(server_id = %server.server_id, file = %remote_path, bytes, "staged demo");
                self.metrics.inc_demo_ingested();
                report.ingested += 1;
            }
            Err(err) => {
                warn!(
                    server_id = %server.server_id,
                    file = %remote_path,
                    error = ?err,
                    "failed to download demo"
                );
                self.metrics.inc_ingest_failure("retrieve");
                report.failed += 1;
                return;
            }
        }

        match window.insert(staged_path) {
            Ok(WindowInsert::Copied { evicted }) => {
                for _ in &evicted {
                    self.metrics.inc_window_eviction();
                }
                report.evicted += evicted.len();
            }
            Ok(WindowInsert::AlreadyPresent) => {}
            Err(err) => {
                warn!(file = %staged_path.display(), error = ?err, "failed to update latest window");
                self.metrics.inc_ingest_failure("window");
            }
        }

        match batcher.rotate_if_full() {
            Ok(Some(batch)) => {
                self.metrics.record_archive(batch.entries.len());
                report.archives.push(batch.range);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(server_id = %server.server_id, error = ?err, "failed to rotate archive");
                self.metrics.inc_ingest_failure("archive");
            }
        }

        self.delete_remote(server, source, remote_path, report);
    }

    fn delete_remote(
        &self,
        server: &ServerConfig,
        source: &mut dyn RemoteFileSource,
        remote_path: &str,
        report: &mut IngestReport,
    ) {
        match source.delete_file(remote_path) {
            Ok(()) => {
                debug!(server_id = %server.server_id, file = %remote_path, "deleted remote demo");
                report.remote_deleted += 1;
            }
            Err(err) => {
                warn!(
                    server_id = %server.server_id,
                    file = %remote_path,
                    error = ?err,
                    "failed to delete remote demo"
                );
                self.metrics.inc_ingest_failure("remote_delete");
                report.remote_delete_failures += 1;
            }
        }
    }
}

fn ensure_dir(dir: &Path) -> IngestResult<()> {
    fs::create_dir_all(dir).map_err(|source| IngestError::io("prepare.create_dir", dir, source))
}
