use std::sync::Arc;

use demovault_config::{AppConfig, LogFormatSetting};
use demovault_remote::{ControlPlaneConnector, FtpConnector, LifecycleConnector, RemoteConnector};
use demovault_telemetry::{JobKind, JobStatus, LogFormat, LoggingConfig, Metrics};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::jobs::JobContext;
use crate::scheduler::{JobRunner, spawn_interval};

/// Environment variable selecting a one-shot run (`ingest`, `maps` or `all`).
pub const RUN_ONCE_ENV: &str = "DEMOVAULT_RUN_ONCE";

/// How the application drives its jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Run each job on its interval until Ctrl-C.
    Scheduled,
    /// Run the listed jobs once, in order, then exit.
    Once(Vec<JobKind>),
}

impl RunMode {
    /// Parse the value of [`RUN_ONCE_ENV`]; unset or blank means scheduled.
    ///
    /// # Errors
    ///
    /// Returns an error for values other than `ingest`, `maps` or `all`.
    pub fn parse(value: Option<&str>) -> AppResult<Self> {
        let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
            return Ok(Self::Scheduled);
        };
        match value.to_ascii_lowercase().as_str() {
            "ingest" => Ok(Self::Once(vec![JobKind::Ingest])),
            "maps" => Ok(Self::Once(vec![JobKind::Maps])),
            "all" => Ok(Self::Once(vec![JobKind::Ingest, JobKind::Maps])),
            _ => Err(AppError::InvalidConfig {
                field: RUN_ONCE_ENV,
                reason: "unknown_job",
                value: Some(value.to_string()),
            }),
        }
    }
}

/// Dependencies required to run the application.
pub struct BootstrapDependencies {
    config: Arc<AppConfig>,
    metrics: Metrics,
    remote: Arc<dyn RemoteConnector>,
    lifecycle: Arc<dyn LifecycleConnector>,
    mode: RunMode,
}

impl BootstrapDependencies {
    /// Assemble dependencies from explicit parts.
    #[must_use]
    pub fn new(
        config: Arc<AppConfig>,
        metrics: Metrics,
        remote: Arc<dyn RemoteConnector>,
        lifecycle: Arc<dyn LifecycleConnector>,
        mode: RunMode,
    ) -> Self {
        Self {
            config,
            metrics,
            remote,
            lifecycle,
            mode,
        }
    }

    /// Construct production dependencies from the environment and configuration file,
    /// installing the global logger along the way.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, logger installation or metrics
    /// registration fails.
    pub fn from_env() -> AppResult<Self> {
        let config =
            demovault_config::load_from_env().map_err(|err| AppError::config("config.load", err))?;

        let logging = LoggingConfig {
            level: &config.logging.level,
            format: match config.logging.format {
                LogFormatSetting::Auto => LogFormat::infer(),
                LogFormatSetting::Json => LogFormat::Json,
                LogFormatSetting::Pretty => LogFormat::Pretty,
            },
        };
        demovault_telemetry::init_logging(&logging)
            .map_err(|err| AppError::telemetry("telemetry.init", err))?;
        info!(
            servers = config.servers.len(),
            log_level = %config.logging.level,
            "configuration loaded"
        );

        let mode = RunMode::parse(std::env::var(RUN_ONCE_ENV).ok().as_deref())?;
        let metrics =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let lifecycle = Arc::new(ControlPlaneConnector::new(config.control_plane.clone()));

        Ok(Self::new(
            Arc::new(config),
            metrics,
            Arc::new(FtpConnector::default()),
            lifecycle,
            mode,
        ))
    }
}

/// Entry point for the application boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or the shutdown signal listener fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies.
///
/// # Errors
///
/// Returns an error if the shutdown signal cannot be awaited.
pub async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    let BootstrapDependencies {
        config,
        metrics,
        remote,
        lifecycle,
        mode,
    } = dependencies;

    info!(
        servers = config.servers.len(),
        demos_enabled = config.demos.enabled,
        maps_enabled = config.maps.enabled,
        "demovault starting"
    );

    let demo_interval = config.demos.interval();
    let map_interval = config.maps.interval();
    let context = Arc::new(JobContext::new(config, metrics.clone(), remote, lifecycle));
    let ingest = Arc::new(JobRunner::new(JobKind::Ingest, Arc::clone(&context)));
    let maps = Arc::new(JobRunner::new(JobKind::Maps, context));

    match mode {
        RunMode::Once(jobs) => {
            for job in jobs {
                let runner = match job {
                    JobKind::Ingest => &ingest,
                    JobKind::Maps => &maps,
                };
                let status = runner.trigger().await;
                if status == JobStatus::Failed {
                    warn!(job = job.as_str(), "one-shot job failed");
                }
            }
            info!("one-shot run complete");
            log_metrics(&metrics);
            Ok(())
        }
        RunMode::Scheduled => {
            let handles = [
                spawn_interval(ingest, demo_interval),
                spawn_interval(maps, map_interval),
            ];
            let signal = tokio::signal::ctrl_c().await;
            for handle in &handles {
                handle.abort();
            }
            signal.map_err(|err| AppError::io("signal.ctrl_c", err))?;
            info!("shutdown signal received; scheduler stopped");
            log_metrics(&metrics);
            Ok(())
        }
    }
}

fn log_metrics(metrics: &Metrics) {
    match metrics.render() {
        Ok(exposition) => debug!(%exposition, "final metrics"),
        Err(err) => warn!(error = ?err, "failed to render metrics"),
    }
}
