use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Lifecycle of one supervised unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// How a unit went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The unit observed its shutdown signal within the grace period.
    Graceful,
    /// The grace period elapsed and the task was aborted.
    Forced,
}

/// A supervised unit: a named task plus the cooperative shutdown channel the
/// supervisor signals during `Stopping`. Owned exclusively by the supervisor.
#[derive(Debug)]
pub struct ProcessHandle {
    name: String,
    token: Uuid,
    state: UnitState,
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ProcessHandle {
    /// Launch a unit. The closure receives the shutdown receiver it must
    /// select on; the returned future becomes the unit's task.
    pub fn spawn<F, Fut>(name: &str, unit: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, receiver) = watch::channel(false);
        let join = tokio::spawn(unit(receiver));
        tracing::info!(unit = name, "unit started");
        Self {
            name: name.to_string(),
            token: Uuid::new_v4(),
            state: UnitState::Running,
            shutdown,
            join,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Signal the unit, wait out the grace period, abort if it is still
    /// alive. The handle is consumed either way; the unit ends Stopped.
    pub async fn stop(mut self, grace: Duration) -> StopOutcome {
        self.state = UnitState::Stopping;
        let _ = self.shutdown.send(true);

        let outcome = match tokio::time::timeout(grace, &mut self.join).await {
            Ok(_) => StopOutcome::Graceful,
            Err(_) => {
                tracing::warn!(unit = %self.name, "unit ignored shutdown, aborting");
                self.join.abort();
                let _ = (&mut self.join).await;
                StopOutcome::Forced
            }
        };
        self.state = UnitState::Stopped;
        tracing::info!(unit = %self.name, ?outcome, "unit stopped");
        outcome
    }
}
