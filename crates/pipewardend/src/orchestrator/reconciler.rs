//! Restores web output when the engine dies while native output is active.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::registry::ExitEvent;

use super::{Mode, ORCHESTRATOR_TARGET, Orchestrator, ProcessResult, Transition};

/// What the reconciler did with one exit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The exit was not the engine's.
    Unrelated,
    /// The instance had been stopped or replaced on purpose.
    Expected,
    /// An intentional termination is in progress or settling.
    Suppressed,
    /// The engine died in web mode; nothing is restarted.
    WebModeUntouched,
    /// A newer engine instance was launched before the exit was handled.
    Superseded {
        /// Pid of the live replacement.
        pid: u32,
    },
    /// The engine died in native mode and web output was restored.
    FellBack {
        /// Web engine launch.
        engine: ProcessResult,
        /// Relay launch after the upstream wait.
        relay: ProcessResult,
    },
}

/// Subscribes to registry exits and reconciles each one on a background
/// task. The subscription is taken before this function returns.
pub fn spawn_reconciler(orchestrator: Orchestrator) -> JoinHandle<()> {
    let mut exits = orchestrator.registry().subscribe();
    tokio::spawn(async move {
        loop {
            match exits.recv().await {
                Ok(event) => {
                    orchestrator.inner.reporter.process_exited(&event);
                    let outcome = orchestrator.reconcile(&event).await;
                    debug!(
                        target: ORCHESTRATOR_TARGET,
                        process = %event.name,
                        ?outcome,
                        "exit reconciled"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        target: ORCHESTRATOR_TARGET,
                        skipped,
                        "reconciler lagged behind exit events"
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

impl Orchestrator {
    /// Applies the crash policy to one exit event.
    pub async fn reconcile(&self, event: &ExitEvent) -> ReconcileOutcome {
        let catalogue = &self.inner.catalogue;
        if event.name != catalogue.engine_name() {
            return ReconcileOutcome::Unrelated;
        }
        if event.expected {
            return ReconcileOutcome::Expected;
        }
        if self.is_suppressed() {
            return ReconcileOutcome::Suppressed;
        }

        let _operation = self.inner.operation.lock().await;
        if self.is_suppressed() {
            return ReconcileOutcome::Suppressed;
        }
        if self.mode() == Mode::Web {
            info!(
                target: ORCHESTRATOR_TARGET,
                pid = event.pid,
                "engine exited in web mode; leaving it down"
            );
            return ReconcileOutcome::WebModeUntouched;
        }

        if let Some(pid) = self
            .inner
            .registry
            .pid(catalogue.engine_name())
            .filter(|pid| *pid != event.pid)
        {
            info!(
                target: ORCHESTRATOR_TARGET,
                crashed = event.pid,
                pid,
                "engine already replaced; keeping native output"
            );
            return ReconcileOutcome::Superseded { pid };
        }

        self.inner.reporter.fallback_triggered(event);
        self.transition(Transition::Fallback);
        self.set_mode(Mode::Web);

        let engine = self.launch(&catalogue.engine(Mode::Web));
        let relay = self.launch_relay_when_ready().await;

        self.transition(Transition::Switched(Mode::Web));
        self.inner.reporter.mode_switched(Mode::Web);
        ReconcileOutcome::FellBack { engine, relay }
    }
}
