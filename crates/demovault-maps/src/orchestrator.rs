//! Map-cache deletion coordinated with the server's run state.
//!
//! # Design
//! - One linear pass per server: size gate, liveness, occupancy, shutdown, delete,
//!   restart. Each step either advances or produces a terminal [`AbortReason`].
//! - Nothing is cached between runs; every lifecycle answer is fetched fresh.
//! - A server this pass stopped is always started again, even when deletion failed.

use demovault_config::{MapSettings, ServerConfig};
use demovault_remote::{RemoteFileSource, ServerLifecycle, join};
use demovault_telemetry::Metrics;
use tracing::{error, info, warn};

use crate::error::MapsError;
use crate::tree::{TreeDeletion, delete_tree_contents, tree_size};

/// Why a pass ended without deleting the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The content tree is below the configured threshold.
    TooSmall {
        /// Measured size in bytes.
        size_bytes: u64,
    },
    /// The content tree could not be measured.
    SizeQueryFailed,
    /// The run state could not be queried.
    LivenessQueryFailed,
    /// Players are connected or the count is unknown.
    Occupied {
        /// Reported player count.
        players: Option<u32>,
    },
    /// The player count could not be queried.
    OccupancyQueryFailed,
    /// The stop request was not confirmed; nothing was touched.
    ShutdownFailed,
    /// Deletion stopped at `path`.
    DeleteFailed {
        /// First path that could not be removed.
        path: String,
        /// Restart outcome when this pass stopped the server.
        restarted: Option<bool>,
    },
}

/// Result of one pruning pass for a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapDeletionDecision {
    /// The pass stopped before or during deletion.
    Aborted(AbortReason),
    /// The cache was deleted.
    Executed {
        /// `None` when the server was not running; otherwise whether the restart
        /// succeeded.
        restarted: Option<bool>,
    },
}

impl MapDeletionDecision {
    /// Label used in metrics and logs.
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::Executed { .. } => "executed",
            Self::Aborted(reason) => match reason {
                AbortReason::TooSmall { .. } => "too_small",
                AbortReason::SizeQueryFailed => "size_query_failed",
                AbortReason::LivenessQueryFailed => "liveness_query_failed",
                AbortReason::Occupied { .. } => "occupied",
                AbortReason::OccupancyQueryFailed => "occupancy_query_failed",
                AbortReason::ShutdownFailed => "shutdown_failed",
                AbortReason::DeleteFailed { .. } => "delete_failed",
            },
        }
    }
}

/// Runs pruning passes with fixed map settings.
#[derive(Clone)]
pub struct MapDeletionOrchestrator {
    settings: MapSettings,
    metrics: Metrics,
}

impl MapDeletionOrchestrator {
    /// Orchestrator applying `settings` and recording outcomes into `metrics`.
    #[must_use]
    pub const fn new(settings: MapSettings, metrics: Metrics) -> Self {
        Self { settings, metrics }
    }

    /// Run one pruning pass for `server`.
    pub fn run(
        &self,
        server: &ServerConfig,
        source: &mut dyn RemoteFileSource,
        lifecycle: &dyn ServerLifecycle,
    ) -> MapDeletionDecision {
        let decision = self.decide(server, source, lifecycle);
        self.metrics.inc_map_outcome(decision.outcome());
        match &decision {
            MapDeletionDecision::Executed { restarted } => {
                info!(server_id = %server.server_id, ?restarted, "map cache deleted");
            }
            MapDeletionDecision::Aborted(AbortReason::TooSmall { size_bytes }) => {
                info!(
                    server_id = %server.server_id,
                    size_bytes,
                    threshold_bytes = self.settings.min_size_bytes(),
                    "map cache below threshold; nothing to do"
                );
            }
            MapDeletionDecision::Aborted(AbortReason::Occupied { players }) => {
                info!(server_id = %server.server_id, ?players, "server occupied; skipping map deletion");
            }
            MapDeletionDecision::Aborted(reason) => {
                warn!(server_id = %server.server_id, ?reason, "map deletion aborted");
            }
        }
        decision
    }

    fn decide(
        &self,
        server: &ServerConfig,
        source: &mut dyn RemoteFileSource,
        lifecycle: &dyn ServerLifecycle,
    ) -> MapDeletionDecision {
        let server_id = server.server_id.as_str();
        let content_root = join(&server.maps_dir, &self.settings.content_subdir);

        let size_bytes = match tree_size(source, &content_root) {
            Ok(size) => size,
            Err(err) => {
                warn!(server_id, error = ?err, "failed to measure map cache");
                return MapDeletionDecision::Aborted(AbortReason::SizeQueryFailed);
            }
        };
        if size_bytes < self.settings.min_size_bytes() {
            return MapDeletionDecision::Aborted(AbortReason::TooSmall { size_bytes });
        }
        info!(server_id, size_bytes, "map cache above threshold");

        let running = match lifecycle.is_running(server_id) {
            Ok(running) => running,
            Err(err) => {
                let err = MapsError::lifecycle("is_running", server_id, err);
                warn!(error = ?err, "failed to query server run state");
                return MapDeletionDecision::Aborted(AbortReason::LivenessQueryFailed);
            }
        };

        let stopped_by_us = if running {
            match lifecycle.player_count(server_id) {
                Ok(Some(0)) => {}
                Ok(players) => {
                    return MapDeletionDecision::Aborted(AbortReason::Occupied { players });
                }
                Err(err) => {
                    let err = MapsError::lifecycle("player_count", server_id, err);
                    warn!(error = ?err, "failed to query player count");
                    return MapDeletionDecision::Aborted(AbortReason::OccupancyQueryFailed);
                }
            }
            if let Err(err) = lifecycle.stop(server_id) {
                let err = MapsError::lifecycle("stop", server_id, err);
                warn!(error = ?err, "failed to stop server");
                return MapDeletionDecision::Aborted(AbortReason::ShutdownFailed);
            }
            info!(server_id, "server stopped for map deletion");
            true
        } else {
            info!(server_id, "server not running; deleting without shutdown");
            false
        };

        let deletion = self.delete_cache(source, &server.maps_dir, &content_root);
        let restarted = stopped_by_us.then(|| restart(lifecycle, server_id));

        match deletion {
            TreeDeletion::Completed { files, directories } => {
                info!(server_id, files, directories, "map content removed");
                MapDeletionDecision::Executed { restarted }
            }
            TreeDeletion::Failed(path) => {
                MapDeletionDecision::Aborted(AbortReason::DeleteFailed { path, restarted })
            }
        }
    }

    fn delete_cache(
        &self,
        source: &mut dyn RemoteFileSource,
        maps_dir: &str,
        content_root: &str,
    ) -> TreeDeletion {
        let outcome = delete_tree_contents(source, content_root);
        let TreeDeletion::Completed { files, directories } = outcome else {
            return outcome;
        };

        let manifest = self.settings.manifest_file.as_str();
        let names = match source.list_names(maps_dir) {
            Ok(names) => names,
            Err(err) => {
                warn!(path = maps_dir, error = ?err, "failed to list map directory for manifest");
                return TreeDeletion::Failed(maps_dir.to_string());
            }
        };
        if !names.iter().any(|name| name == manifest) {
            return TreeDeletion::Completed { files, directories };
        }

        let manifest_path = join(maps_dir, manifest);
        match source.delete_file(&manifest_path) {
            Ok(()) => TreeDeletion::Completed {
                files: files + 1,
                directories,
            },
            Err(err) => {
                let err = MapsError::remote("manifest.delete", &manifest_path, err);
                warn!(error = ?err, "failed to delete map manifest");
                TreeDeletion::Failed(manifest_path)
            }
        }
    }
}

fn restart(lifecycle: &dyn ServerLifecycle, server_id: &str) -> bool {
    match lifecycle.start(server_id) {
        Ok(()) => {
            info!(server_id, "server restarted after map deletion");
            true
        }
        Err(err) => {
            let err = MapsError::lifecycle("start", server_id, err);
            error!(error = ?err, "failed to restart server after map deletion");
            false
        }
    }
}
