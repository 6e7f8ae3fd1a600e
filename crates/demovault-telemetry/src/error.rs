//! # Design
//!
//! - Collector failures keep the metric name and whether building or registering
//!   failed, so a duplicate registration is easy to tell apart from a bad definition.
//! - Messages are constant; sources are preserved.

use prometheus::Error as PrometheusError;
use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised by telemetry helpers.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The global tracing subscriber could not be installed.
    #[error("tracing subscriber installation failed")]
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A Prometheus collector could not be built or registered.
    #[error("metrics collector setup failed")]
    Collector {
        /// `build` or `register`.
        operation: &'static str,
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// The registry could not be encoded in text exposition format.
    #[error("metrics exposition failed")]
    Exposition {
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// The encoded exposition was not UTF-8.
    #[error("metrics exposition was not utf-8")]
    ExpositionUtf8 {
        /// Underlying conversion error.
        source: std::string::FromUtf8Error,
    },
}

impl TelemetryError {
    pub(crate) const fn collector(
        operation: &'static str,
        name: &'static str,
        source: PrometheusError,
    ) -> Self {
        Self::Collector {
            operation,
            name,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn collector_error_keeps_context() {
        let err = TelemetryError::collector(
            "register",
            "demos_ingested_total",
            PrometheusError::AlreadyReg,
        );
        assert!(matches!(
            err,
            TelemetryError::Collector {
                operation: "register",
                name: "demos_ingested_total",
                ..
            }
        ));
        assert_eq!(err.to_string(), "metrics collector setup failed");
        assert!(err.source().is_some());
    }

    #[test]
    fn exposition_errors_have_constant_messages() {
        let Err(utf8) = String::from_utf8(vec![0xff, 0xfe]) else {
            return;
        };
        let err = TelemetryError::ExpositionUtf8 { source: utf8 };
        assert_eq!(err.to_string(), "metrics exposition was not utf-8");

        let err = TelemetryError::Exposition {
            source: PrometheusError::Msg("encode".into()),
        };
        assert!(err.source().is_some());
    }
}
