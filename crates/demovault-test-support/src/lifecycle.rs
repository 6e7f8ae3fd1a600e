//! Scripted server lifecycle for orchestrator and job tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use demovault_remote::{LifecycleConnector, LifecycleError, LifecycleResult, ServerLifecycle};

/// Lifecycle request recorded by [`ScriptedLifecycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleCall {
    /// Run-state query.
    IsRunning(String),
    /// Player count query.
    PlayerCount(String),
    /// Stop request.
    Stop(String),
    /// Start request.
    Start(String),
}

#[derive(Debug)]
struct Script {
    running: bool,
    players: Option<u32>,
    running_query_fails: bool,
    player_query_fails: bool,
    stop_fails: bool,
    start_fails: bool,
    calls: Vec<LifecycleCall>,
}

/// Lifecycle double whose answers are fixed up front.
///
/// Successful stop and start requests flip the running flag. Clones share state.
#[derive(Debug, Clone)]
pub struct ScriptedLifecycle {
    script: Arc<Mutex<Script>>,
}

impl ScriptedLifecycle {
    /// A running server with `players` online.
    #[must_use]
    pub fn running(players: Option<u32>) -> Self {
        Self::with_state(true, players)
    }

    /// A stopped server.
    #[must_use]
    pub fn stopped() -> Self {
        Self::with_state(false, Some(0))
    }

    fn with_state(running: bool, players: Option<u32>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                running,
                players,
                running_query_fails: false,
                player_query_fails: false,
                stop_fails: false,
                start_fails: false,
                calls: Vec::new(),
            })),
        }
    }

    /// Make run-state queries fail.
    #[must_use]
    pub fn failing_running_query(self) -> Self {
        self.lock().running_query_fails = true;
        self
    }

    /// Make player count queries fail.
    #[must_use]
    pub fn failing_player_query(self) -> Self {
        self.lock().player_query_fails = true;
        self
    }

    /// Make stop requests fail.
    #[must_use]
    pub fn failing_stop(self) -> Self {
        self.lock().stop_fails = true;
        self
    }

    /// Make start requests fail.
    #[must_use]
    pub fn failing_start(self) -> Self {
        self.lock().start_fails = true;
        self
    }

    /// Every recorded call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<LifecycleCall> {
        self.lock().calls.clone()
    }

    /// Whether any stop or start request was issued.
    #[must_use]
    pub fn touched_run_state(&self) -> bool {
        self.lock()
            .calls
            .iter()
            .any(|call| matches!(call, LifecycleCall::Stop(_) | LifecycleCall::Start(_)))
    }

    /// Current scripted run state.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.lock().running
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn rejected(operation: &'static str, server_id: &str) -> LifecycleError {
    LifecycleError::Rejected {
        operation,
        server_id: server_id.to_string(),
    }
}

impl ServerLifecycle for ScriptedLifecycle {
    fn is_running(&self, server_id: &str) -> LifecycleResult<bool> {
        let mut script = self.lock();
        script.calls.push(LifecycleCall::IsRunning(server_id.to_string()));
        if script.running_query_fails {
            return Err(rejected("status", server_id));
        }
        Ok(script.running)
    }

    fn player_count(&self, server_id: &str) -> LifecycleResult<Option<u32>> {
        let mut script = self.lock();
        script.calls.push(LifecycleCall::PlayerCount(server_id.to_string()));
        if script.player_query_fails {
            return Err(rejected("status", server_id));
        }
        Ok(script.players)
    }

    fn stop(&self, server_id: &str) -> LifecycleResult<()> {
        let mut script = self.lock();
        script.calls.push(LifecycleCall::Stop(server_id.to_string()));
        if script.stop_fails {
            return Err(rejected("stop", server_id));
        }
        script.running = false;
        Ok(())
    }

    fn start(&self, server_id: &str) -> LifecycleResult<()> {
        let mut script = self.lock();
        script.calls.push(LifecycleCall::Start(server_id.to_string()));
        if script.start_fails {
            return Err(rejected("start", server_id));
        }
        script.running = true;
        Ok(())
    }
}

impl LifecycleConnector for ScriptedLifecycle {
    fn connect(&self) -> LifecycleResult<Box<dyn ServerLifecycle>> {
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_and_start_flip_run_state() -> LifecycleResult<()> {
        let lifecycle = ScriptedLifecycle::running(Some(0));
        lifecycle.stop("s1")?;
        assert!(!lifecycle.is_running("s1")?);
        lifecycle.start("s1")?;
        assert!(lifecycle.is_up());
        assert!(lifecycle.touched_run_state());
        Ok(())
    }

    #[test]
    fn scripted_failures_do_not_change_state() {
        let lifecycle = ScriptedLifecycle::running(None).failing_stop();
        assert!(lifecycle.stop("s1").is_err());
        assert!(lifecycle.is_up());
        assert_eq!(lifecycle.calls(), vec![LifecycleCall::Stop("s1".into())]);
    }
}
