//! Single-flight job runner and fixed-interval scheduling.
//!
//! # Design
//! - Each job kind owns one [`SingleFlight`]; a trigger that finds it held is skipped.
//! - The guard travels into the blocking task, so the flight stays held until the job
//!   body returns even if the awaiting task goes away.
//! - Every tick spawns its own trigger task so a long run never delays the next tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use demovault_telemetry::{JobKind, JobStatus};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::jobs::JobContext;

/// Mutual exclusion for one job kind.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    running: Arc<AtomicBool>,
}

impl SingleFlight {
    /// A flight that is not held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the flight, or `None` when a previous holder is still running.
    #[must_use]
    pub fn try_acquire(&self) -> Option<FlightGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                running: Arc::clone(&self.running),
            })
    }

    /// Whether the flight is currently held.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Releases the flight on drop.
#[derive(Debug)]
pub struct FlightGuard {
    running: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Runs one job kind with single-flight protection.
pub struct JobRunner {
    kind: JobKind,
    flight: SingleFlight,
    context: Arc<JobContext>,
}

impl JobRunner {
    /// Runner for `kind` over `context`.
    #[must_use]
    pub fn new(kind: JobKind, context: Arc<JobContext>) -> Self {
        Self {
            kind,
            flight: SingleFlight::new(),
            context,
        }
    }

    /// Job kind this runner executes.
    #[must_use]
    pub const fn kind(&self) -> JobKind {
        self.kind
    }

    /// Run the job once unless a previous run is still in progress.
    pub async fn trigger(&self) -> JobStatus {
        let job = self.kind.as_str();
        let Some(guard) = self.flight.try_acquire() else {
            warn!(job, "previous run still in progress; skipping trigger");
            self.context
                .metrics()
                .inc_job_run(self.kind, JobStatus::Overlapped);
            return JobStatus::Overlapped;
        };

        info!(job, "job run starting");
        let context = Arc::clone(&self.context);
        let kind = self.kind;
        let status = match tokio::task::spawn_blocking(move || {
            let _guard = guard;
            match kind {
                JobKind::Ingest => context.run_ingest(),
                JobKind::Maps => context.run_maps(),
            }
        })
        .await
        {
            Ok(status) => status,
            Err(err) => {
                error!(job, error = %err, "job task failed");
                JobStatus::Failed
            }
        };

        let metrics = self.context.metrics();
        metrics.inc_job_run(self.kind, status);
        let snapshot = metrics.snapshot();
        info!(
            job,
            status = status.as_str(),
            demos_ingested_total = snapshot.demos_ingested_total,
            window_evictions_total = snapshot.window_evictions_total,
            archives_created_total = snapshot.archives_created_total,
            archived_demos_total = snapshot.archived_demos_total,
            "job run finished"
        );
        status
    }
}

/// Trigger `runner` every `period`, starting immediately.
///
/// Missed ticks are skipped rather than replayed. Abort the returned handle to stop
/// scheduling; runs already in flight complete on their own.
pub fn spawn_interval(runner: Arc<JobRunner>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(job = runner.kind().as_str(), period_secs = period.as_secs(), "job scheduled");
        loop {
            ticker.tick().await;
            let runner = Arc::clone(&runner);
            tokio::spawn(async move {
                runner.trigger().await;
            });
        }
    })
}
