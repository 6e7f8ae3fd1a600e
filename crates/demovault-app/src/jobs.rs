//! Job bodies iterating the configured servers.
//!
//! Both jobs are blocking and are meant to run on the blocking pool. Servers are
//! processed one after another; a failure on one server is logged and the next server
//! is still visited.

use std::sync::Arc;

use demovault_config::AppConfig;
use demovault_ingest::IngestService;
use demovault_maps::MapDeletionOrchestrator;
use demovault_remote::{LifecycleConnector, RemoteConnector};
use demovault_telemetry::{JobStatus, Metrics};
use tracing::{info, warn};

/// Shared, read-only state handed to every job run.
#[derive(Clone)]
pub struct JobContext {
    config: Arc<AppConfig>,
    metrics: Metrics,
    remote: Arc<dyn RemoteConnector>,
    lifecycle: Arc<dyn LifecycleConnector>,
}

impl JobContext {
    /// Bundle configuration, metrics and the remote connectors.
    #[must_use]
    pub fn new(
        config: Arc<AppConfig>,
        metrics: Metrics,
        remote: Arc<dyn RemoteConnector>,
        lifecycle: Arc<dyn LifecycleConnector>,
    ) -> Self {
        Self {
            config,
            metrics,
            remote,
            lifecycle,
        }
    }

    /// Metrics registry shared by all jobs.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Ingest demos from every configured server.
    #[must_use]
    pub fn run_ingest(&self) -> JobStatus {
        if !self.config.demos.enabled {
            info!("demo ingestion disabled; skipping run");
            return JobStatus::Disabled;
        }

        let service = IngestService::new(self.config.demos.clone(), self.metrics.clone());
        for server in &self.config.servers {
            let mut session = match self.remote.connect(server) {
                Ok(session) => session,
                Err(err) => {
                    warn!(server_id = %server.server_id, error = ?err, "failed to connect for demo ingestion");
                    self.metrics.inc_ingest_failure("connect");
                    continue;
                }
            };
            let storage = self.config.storage_for(server);
            if let Err(err) = service.run(server, storage, session.as_mut()) {
                warn!(server_id = %server.server_id, error = ?err, "demo ingestion aborted for server");
            }
        }
        JobStatus::Completed
    }

    /// Prune oversized map caches on every configured server.
    #[must_use]
    pub fn run_maps(&self) -> JobStatus {
        if !self.config.maps.enabled {
            info!("map pruning disabled; skipping run");
            return JobStatus::Disabled;
        }

        let lifecycle = match self.lifecycle.connect() {
            Ok(lifecycle) => lifecycle,
            Err(err) => {
                warn!(error = ?err, "failed to build control-plane client");
                return JobStatus::Failed;
            }
        };

        let orchestrator =
            MapDeletionOrchestrator::new(self.config.maps.clone(), self.metrics.clone());
        for server in &self.config.servers {
            let mut session = match self.remote.connect(server) {
                Ok(session) => session,
                Err(err) => {
                    warn!(server_id = %server.server_id, error = ?err, "failed to connect for map pruning");
                    continue;
                }
            };
            let decision = orchestrator.run(server, session.as_mut(), lifecycle.as_ref());
            info!(
                server_id = %server.server_id,
                outcome = decision.outcome(),
                "map pruning finished"
            );
        }
        JobStatus::Completed
    }
}
