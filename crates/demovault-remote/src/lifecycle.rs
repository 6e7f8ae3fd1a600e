//! Remote server run-state capability.

use crate::error::LifecycleResult;

/// Queries and controls a game server's run state through the hosting control plane.
///
/// Every call is authenticated independently and reflects the state at call time.
pub trait ServerLifecycle: Send + Sync {
    /// Whether the server is currently running.
    ///
    /// # Errors
    ///
    /// Returns an error if the state could not be queried.
    fn is_running(&self, server_id: &str) -> LifecycleResult<bool>;

    /// Players currently connected; `None` when the control plane does not report it.
    ///
    /// # Errors
    ///
    /// Returns an error if the state could not be queried.
    fn player_count(&self, server_id: &str) -> LifecycleResult<Option<u32>>;

    /// Request a stop; `Ok` only when the control plane confirmed it.
    ///
    /// # Errors
    ///
    /// Returns an error if the stop was not confirmed.
    fn stop(&self, server_id: &str) -> LifecycleResult<()>;

    /// Request a start; `Ok` only when the control plane confirmed it.
    ///
    /// # Errors
    ///
    /// Returns an error if the start was not confirmed.
    fn start(&self, server_id: &str) -> LifecycleResult<()>;
}

/// Builds lifecycle clients for one job run.
pub trait LifecycleConnector: Send + Sync {
    /// Create a client ready to issue requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed.
    fn connect(&self) -> LifecycleResult<Box<dyn ServerLifecycle>>;
}
