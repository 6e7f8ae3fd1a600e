//! REST-backed [`ServerLifecycle`] for the hosting control plane.
//!
//! # Design
//! - Status comes from `GET {base}/game-servers/{id}` (`on`, `players_online`).
//! - Stop/start are `POST {base}/game-servers/{id}/stop|start`; only a success status
//!   counts as confirmation.
//! - Every request carries basic authentication; no session state is kept.
//! - Uses the blocking client: callers run on the blocking pool.

use std::thread;
use std::time::Duration;

use demovault_config::ControlPlaneSettings;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{LifecycleError, LifecycleResult};
use crate::lifecycle::{LifecycleConnector, ServerLifecycle};

#[derive(Debug, Deserialize)]
struct ServerStatus {
    #[serde(default)]
    on: bool,
    #[serde(default)]
    players_online: Option<i64>,
}

impl ServerStatus {
    fn players(&self) -> Option<u32> {
        self.players_online.and_then(|count| u32::try_from(count).ok())
    }
}

/// Builds [`ControlPlaneClient`]s from configuration.
#[derive(Debug, Clone)]
pub struct ControlPlaneConnector {
    settings: ControlPlaneSettings,
}

impl ControlPlaneConnector {
    /// Connector for the given control-plane settings.
    #[must_use]
    pub const fn new(settings: ControlPlaneSettings) -> Self {
        Self { settings }
    }
}

impl LifecycleConnector for ControlPlaneConnector {
    fn connect(&self) -> LifecycleResult<Box<dyn ServerLifecycle>> {
        Ok(Box::new(ControlPlaneClient::new(&self.settings)?))
    }
}

/// Blocking HTTP client for the hosting control plane.
pub struct ControlPlaneClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
    stop_settle: Duration,
}

impl ControlPlaneClient {
    /// Build a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(settings: &ControlPlaneSettings) -> LifecycleResult<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|source| LifecycleError::Client { source })?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            username: settings.username.clone(),
            password: settings.password.expose().to_string(),
            stop_settle: settings.stop_settle(),
        })
    }

    fn server_url(&self, server_id: &str) -> String {
        format!("{}/game-servers/{server_id}", self.base_url)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }

    fn status(&self, server_id: &str) -> LifecycleResult<ServerStatus> {
        let url = self.server_url(server_id);
        let response = self
            .authed(self.http.get(&url))
            .send()
            .map_err(|source| LifecycleError::Http {
                operation: "status",
                url: url.clone(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(LifecycleError::HttpStatus {
                operation: "status",
                url,
                status: response.status().as_u16(),
            });
        }
        response.json().map_err(|source| LifecycleError::Http {
            operation: "status.decode",
            url,
            source,
        })
    }

    fn post(&self, operation: &'static str, server_id: &str) -> LifecycleResult<()> {
        let url = format!("{}/{operation}", self.server_url(server_id));
        let response = self
            .authed(self.http.post(&url))
            .send()
            .map_err(|source| LifecycleError::Http {
                operation,
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if status.is_success() {
            debug!(server_id, operation, "control plane confirmed request");
            Ok(())
        } else {
            Err(LifecycleError::HttpStatus {
                operation,
                url,
                status: status.as_u16(),
            })
        }
    }
}

impl ServerLifecycle for ControlPlaneClient {
    fn is_running(&self, server_id: &str) -> LifecycleResult<bool> {
        Ok(self.status(server_id)?.on)
    }

    fn player_count(&self, server_id: &str) -> LifecycleResult<Option<u32>> {
        Ok(self.status(server_id)?.players())
    }

    fn stop(&self, server_id: &str) -> LifecycleResult<()> {
        self.post("stop", server_id)?;
        if !self.stop_settle.is_zero() {
            info!(
                server_id,
                settle_ms = u64::try_from(self.stop_settle.as_millis()).unwrap_or(u64::MAX),
                "waiting for server to settle after stop"
            );
            thread::sleep(self.stop_settle);
        }
        Ok(())
    }

    fn start(&self, server_id: &str) -> LifecycleResult<()> {
        self.post("start", server_id)
    }
}
