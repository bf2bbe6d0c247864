//! Process supervision: single-instance locking, supervised units, and the
//! Idle → Starting → Running → Stopping → Stopped state machine.

pub mod handle;
pub mod lock;

pub use handle::{ProcessHandle, StopOutcome, UnitState};
pub use lock::InstanceLock;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use utoipa::ToSchema;

use crate::command::Origin;
use crate::config::Config;
use crate::core::Core;
use crate::error::{CoreError, CoreResult};
use crate::event::{CoreEvent, StateChangedPayload, UnitPayload};
use crate::listen::{PhraseSource, SilentPhraseSource, StdinPhraseSource};
use crate::relay::RelayServer;
use crate::schedule::Scheduler;
use crate::server::ApiServer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

/// Requests accepted while Running. Stop tears everything down; Restart
/// re-runs the Starting sequence from a clean Stopped state without a new
/// process invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Stop,
    Restart,
}

/// Cloneable sender half of the supervisor's control channel. The stop and
/// restart capabilities, the CLI, and the signal watcher all go through this.
#[derive(Clone)]
pub struct ControlHandle {
    sender: mpsc::Sender<ControlSignal>,
}

impl ControlHandle {
    pub fn new(sender: mpsc::Sender<ControlSignal>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, signal: ControlSignal) -> CoreResult<()> {
        self.sender
            .send(signal)
            .await
            .map_err(|_| CoreError::Internal("supervisor control channel closed".to_string()))
    }
}

/// Owns the lifecycle of every long-running unit: the offline relay, the
/// HTTP front door, the scheduler, and the foreground listen loop. Holds the
/// instance lock for the whole Running state and is the only component
/// allowed to remove it.
pub struct Supervisor {
    config: Config,
    control_tx: mpsc::Sender<ControlSignal>,
    control_rx: mpsc::Receiver<ControlSignal>,
    state_tx: watch::Sender<SupervisorState>,
    state_rx: watch::Receiver<SupervisorState>,
}

impl Supervisor {
    pub fn new(config: Config) -> Self {
        let (control_tx, control_rx) = mpsc::channel(8);
        let (state_tx, state_rx) = watch::channel(SupervisorState::Idle);
        Self {
            config,
            control_tx,
            control_rx,
            state_tx,
            state_rx,
        }
    }

    pub fn control_handle(&self) -> ControlHandle {
        ControlHandle::new(self.control_tx.clone())
    }

    pub fn state_watch(&self) -> watch::Receiver<SupervisorState> {
        self.state_rx.clone()
    }

    pub fn state(&self) -> SupervisorState {
        *self.state_rx.borrow()
    }

    /// Run until a stop request or termination signal. Equivalent to
    /// [`Supervisor::run_with_source`] with the configured phrase source.
    pub async fn run(self, core: Arc<Core>) -> CoreResult<()> {
        let source: Box<dyn PhraseSource> = if self.config.listener.enabled {
            Box::new(StdinPhraseSource::new())
        } else {
            Box::new(SilentPhraseSource)
        };
        self.run_with_source(core, source).await
    }

    pub async fn run_with_source(
        mut self,
        core: Arc<Core>,
        mut source: Box<dyn PhraseSource>,
    ) -> CoreResult<()> {
        let signal_watcher = spawn_signal_watcher(self.control_handle());
        let outcome = self.supervise(&core, source.as_mut()).await;
        signal_watcher.abort();
        if let Err(error) = &outcome {
            tracing::error!(%error, "supervisor failed");
            self.set_state(SupervisorState::Failed, &core);
        }
        outcome
    }

    async fn supervise(
        &mut self,
        core: &Arc<Core>,
        source: &mut dyn PhraseSource,
    ) -> CoreResult<()> {
        let grace = Duration::from_secs(self.config.supervisor.grace_period_seconds.max(1));
        loop {
            self.set_state(SupervisorState::Starting, core);
            let lock = InstanceLock::acquire(&self.config.supervisor.lock_path)?;
            let handles = self.launch_units(core, grace).await?;
            self.set_state(SupervisorState::Running, core);

            let signal = self.wait_loop(core, source).await;
            tracing::info!(?signal, "supervisor leaving Running");
            self.set_state(SupervisorState::Stopping, core);
            for handle in handles.into_iter().rev() {
                let name = handle.name().to_string();
                handle.stop(grace).await;
                let _ = core
                    .bus()
                    .publish(CoreEvent::UnitStopped(UnitPayload { name }));
            }
            lock.release()?;
            self.set_state(SupervisorState::Stopped, core);

            match signal {
                ControlSignal::Restart => continue,
                ControlSignal::Stop => return Ok(()),
            }
        }
    }

    /// Launch the relay, the front door (if enabled), and the scheduler.
    /// A failure rolls back whatever already started; the lock stays on disk
    /// because the supervisor never reaches Stopped on this path.
    async fn launch_units(
        &self,
        core: &Arc<Core>,
        grace: Duration,
    ) -> CoreResult<Vec<ProcessHandle>> {
        let mut handles = Vec::new();

        match RelayServer::bind(&self.config.relay, &self.config.secret, core.clone()).await {
            Ok(relay) => {
                tracing::info!(addr = ?relay.local_addr(), "offline relay listening");
                handles.push(ProcessHandle::spawn("relay", |shutdown| relay.run(shutdown)));
                self.publish_started(core, "relay");
            }
            Err(error) => return self.rollback(core, handles, grace, error).await,
        }

        if self.config.api.enabled {
            match ApiServer::bind(
                &self.config.api,
                &self.config.secret,
                core.clone(),
                self.state_rx.clone(),
            )
            .await
            {
                Ok(api) => {
                    tracing::info!(addr = ?api.local_addr(), "http front door listening");
                    handles.push(ProcessHandle::spawn("api", |shutdown| api.run(shutdown)));
                    self.publish_started(core, "api");
                }
                Err(error) => return self.rollback(core, handles, grace, error).await,
            }
        }

        let scheduler = Scheduler::new(&self.config.schedule, core.clone());
        handles.push(ProcessHandle::spawn("scheduler", |shutdown| {
            scheduler.run(shutdown)
        }));
        self.publish_started(core, "scheduler");

        Ok(handles)
    }

    async fn rollback(
        &self,
        core: &Arc<Core>,
        handles: Vec<ProcessHandle>,
        grace: Duration,
        error: CoreError,
    ) -> CoreResult<Vec<ProcessHandle>> {
        tracing::error!(%error, "unit launch failed, rolling back started units");
        for handle in handles.into_iter().rev() {
            let name = handle.name().to_string();
            handle.stop(grace).await;
            let _ = core
                .bus()
                .publish(CoreEvent::UnitStopped(UnitPayload { name }));
        }
        Err(match error {
            CoreError::Supervision(_) => error,
            other => CoreError::Supervision(other.to_string()),
        })
    }

    /// The Running state: feed listened phrases into the router and wait for
    /// a control signal.
    async fn wait_loop(&mut self, core: &Arc<Core>, source: &mut dyn PhraseSource) -> ControlSignal {
        let mut source_open = true;
        loop {
            tokio::select! {
                signal = self.control_rx.recv() => {
                    return signal.unwrap_or(ControlSignal::Stop);
                }
                phrase = next_or_pending(source, source_open) => match phrase {
                    Some(text) => {
                        let text = text.trim();
                        if text.is_empty() {
                            continue;
                        }
                        let result = core.submit(text, Origin::Voice).await;
                        println!("{}", result.reply_text);
                    }
                    None => {
                        tracing::info!("phrase source closed, listen loop idle");
                        source_open = false;
                    }
                }
            }
        }
    }

    fn publish_started(&self, core: &Arc<Core>, name: &str) {
        let _ = core.bus().publish(CoreEvent::UnitStarted(UnitPayload {
            name: name.to_string(),
        }));
    }

    fn set_state(&self, state: SupervisorState, core: &Arc<Core>) {
        self.state_tx.send_replace(state);
        tracing::info!(?state, "supervisor state changed");
        let _ = core
            .bus()
            .publish(CoreEvent::StateChanged(StateChangedPayload { state }));
    }
}

async fn next_or_pending(source: &mut dyn PhraseSource, open: bool) -> Option<String> {
    if open {
        source.next_phrase().await
    } else {
        std::future::pending().await
    }
}

fn spawn_signal_watcher(control: ControlHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_termination().await;
        tracing::info!("termination signal received");
        let _ = control.send(ControlSignal::Stop).await;
    })
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(error) => {
            tracing::warn!(%error, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}
