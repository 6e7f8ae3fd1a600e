//! Logging configuration and subscriber installation.
//!
//! # Design
//! - Centralises logging setup (fmt or JSON) with a single entry point.
//! - `RUST_LOG` always wins over the configured level.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};

/// Default logging target when `RUST_LOG` is not provided.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the tracing subscriber cannot be installed (for example,
/// because another subscriber has already been set globally).
pub fn init_logging(config: &LoggingConfig<'_>) -> Result<()> {
    let (json, plain) = match config.format {
        LogFormat::Json => (Some(fmt::layer().json().with_target(false)), None),
        LogFormat::Pretty => (None, Some(fmt::layer().with_target(false))),
    };
    tracing_subscriber::registry()
        .with(build_env_filter(config.level))
        .with(json)
        .with(plain)
        .try_init()
        .map_err(|source| TelemetryError::SubscriberInstall { source })
}

/// Level directive and output format for the global subscriber.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Fallback filter directive used when `RUST_LOG` is unset.
    pub level: &'a str,
    /// JSON lines or human-readable output.
    pub format: LogFormat,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Emit logs as structured JSON objects.
    Json,
    /// Emit human-readable logs.
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
