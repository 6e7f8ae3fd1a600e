//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes a minimal set of counters relevant to the ingestion and map jobs.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Scheduled job families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Demo download, retention and archive rotation.
    Ingest,
    /// Map-cache pruning.
    Maps,
}

impl JobKind {
    /// Label used in metrics and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Maps => "maps",
        }
    }
}

/// How a job trigger ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Every configured server was visited.
    Completed,
    /// A previous invocation was still running.
    Overlapped,
    /// The job is switched off in configuration.
    Disabled,
    /// The job task itself failed to run.
    Failed,
}

impl JobStatus {
    /// Label used in metrics and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Overlapped => "overlapped",
            Self::Disabled => "disabled",
            Self::Failed => "failed",
        }
    }
}

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    demos_ingested_total: IntCounter,
    demos_skipped_total: IntCounterVec,
    ingest_failures_total: IntCounterVec,
    window_evictions_total: IntCounter,
    archives_created_total: IntCounter,
    archived_demos_total: IntCounter,
    map_deletion_outcomes_total: IntCounterVec,
    job_runs_total: IntCounterVec,
}

/// Snapshot of selected counters for end-of-run summaries.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Demos staged successfully since start.
    pub demos_ingested_total: u64,
    /// Window members evicted since start.
    pub window_evictions_total: u64,
    /// Archive batches written since start.
    pub archives_created_total: u64,
    /// Demos rolled into archive batches since start.
    pub archived_demos_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let demos_ingested_total = counter(
            &registry,
            "demos_ingested_total",
            "Demos downloaded and staged locally",
        )?;
        let demos_skipped_total = counter_vec(
            &registry,
            "demos_skipped_total",
            "Remote demos left in place by the ingestion gate",
            &["reason"],
        )?;
        let ingest_failures_total = counter_vec(
            &registry,
            "ingest_failures_total",
            "Ingestion failures by pipeline stage",
            &["stage"],
        )?;
        let window_evictions_total = counter(
            &registry,
            "window_evictions_total",
            "Demos evicted from the latest window",
        )?;
        let archives_created_total = counter(
            &registry,
            "archives_created_total",
            "Archive batches written",
        )?;
        let archived_demos_total = counter(
            &registry,
            "archived_demos_total",
            "Demos rolled into archive batches",
        )?;
        let map_deletion_outcomes_total = counter_vec(
            &registry,
            "map_deletion_outcomes_total",
            "Map deletion decisions by outcome",
            &["outcome"],
        )?;
        let job_runs_total = counter_vec(
            &registry,
            "job_runs_total",
            "Scheduled job triggers by job and status",
            &["job", "status"],
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                demos_ingested_total,
                demos_skipped_total,
                ingest_failures_total,
                window_evictions_total,
                archives_created_total,
                archived_demos_total,
                map_deletion_outcomes_total,
                job_runs_total,
            }),
        })
    }

    /// Increment the staged demo counter.
    pub fn inc_demo_ingested(&self) {
        self.inner.demos_ingested_total.inc();
    }

    /// Increment the gate skip counter for the given reason.
    pub fn inc_demo_skipped(&self, reason: &str) {
        self.inner
            .demos_skipped_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Increment the failure counter for a pipeline stage.
    pub fn inc_ingest_failure(&self, stage: &str) {
        self.inner
            .ingest_failures_total
            .with_label_values(&[stage])
            .inc();
    }

    /// Increment the window eviction counter.
    pub fn inc_window_eviction(&self) {
        self.inner.window_evictions_total.inc();
    }

    /// Record a written archive batch holding `demos` files.
    pub fn record_archive(&self, demos: usize) {
        self.inner.archives_created_total.inc();
        self.inner
            .archived_demos_total
            .inc_by(u64::try_from(demos).unwrap_or(u64::MAX));
    }

    /// Increment the map deletion outcome counter.
    pub fn inc_map_outcome(&self, outcome: &str) {
        self.inner
            .map_deletion_outcomes_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Increment the job trigger counter.
    pub fn inc_job_run(&self, job: JobKind, status: JobStatus) {
        self.inner
            .job_runs_total
            .with_label_values(&[job.as_str(), status.as_str()])
            .inc();
    }

    /// Current value of a gate skip counter.
    #[must_use]
    pub fn demo_skipped(&self, reason: &str) -> u64 {
        self.inner
            .demos_skipped_total
            .with_label_values(&[reason])
            .get()
    }

    /// Current value of a pipeline failure counter.
    #[must_use]
    pub fn ingest_failures(&self, stage: &str) -> u64 {
        self.inner
            .ingest_failures_total
            .with_label_values(&[stage])
            .get()
    }

    /// Current value of a map outcome counter.
    #[must_use]
    pub fn map_outcome(&self, outcome: &str) -> u64 {
        self.inner
            .map_deletion_outcomes_total
            .with_label_values(&[outcome])
            .get()
    }

    /// Current value of a job trigger counter.
    #[must_use]
    pub fn job_runs(&self, job: JobKind, status: JobStatus) -> u64 {
        self.inner
            .job_runs_total
            .with_label_values(&[job.as_str(), status.as_str()])
            .get()
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Exposition { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::ExpositionUtf8 { source })
    }

    /// Take a point-in-time snapshot of the ingestion counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            demos_ingested_total: self.inner.demos_ingested_total.get(),
            window_evictions_total: self.inner.window_evictions_total.get(),
            archives_created_total: self.inner.archives_created_total.get(),
            archived_demos_total: self.inner.archived_demos_total.get(),
        }
    }
}

fn counter(registry: &Registry, name: &'static str, help: &str) -> Result<IntCounter> {
    let collector = IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::collector("build", name, source))?;
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::collector("register", name, source))?;
    Ok(collector)
}

fn counter_vec(
    registry: &Registry,
    name: &'static str,
    help: &str,
    labels: &[&str],
) -> Result<IntCounterVec> {
    let collector = IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::collector("build", name, source))?;
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::collector("register", name, source))?;
    Ok(collector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_demo_ingested();
        metrics.inc_demo_ingested();
        metrics.inc_demo_skipped("too_young");
        metrics.inc_ingest_failure("retrieve");
        metrics.inc_window_eviction();
        metrics.record_archive(3);
        metrics.inc_map_outcome("occupied");
        metrics.inc_job_run(JobKind::Ingest, JobStatus::Completed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.demos_ingested_total, 2);
        assert_eq!(snapshot.window_evictions_total, 1);
        assert_eq!(snapshot.archives_created_total, 1);
        assert_eq!(snapshot.archived_demos_total, 3);
        assert_eq!(metrics.demo_skipped("too_young"), 1);
        assert_eq!(metrics.ingest_failures("retrieve"), 1);
        assert_eq!(metrics.map_outcome("occupied"), 1);
        assert_eq!(metrics.job_runs(JobKind::Ingest, JobStatus::Completed), 1);
        assert_eq!(metrics.job_runs(JobKind::Maps, JobStatus::Completed), 0);

        let rendered = metrics.render()?;
        assert!(rendered.contains("demos_ingested_total 2"));
        assert!(rendered.contains("map_deletion_outcomes_total"));
        assert!(rendered.contains("job_runs_total"));
        Ok(())
    }

    #[test]
    fn registries_are_independent() -> Result<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.inc_demo_ingested();
        assert_eq!(second.snapshot().demos_ingested_total, 0);
        Ok(())
    }

    #[test]
    fn labels_render_as_strings() {
        assert_eq!(JobKind::Maps.as_str(), "maps");
        assert_eq!(JobStatus::Overlapped.as_str(), "overlapped");
    }
}
