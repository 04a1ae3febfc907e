//! Pipeline orchestration across the web and native output modes.
//!
//! [`Orchestrator`] owns the output mode, the explicit state machine and the
//! suppress flag, and sequences registry calls for every operator request.
//! Mode-changing operations (including the crash fallback) take an async
//! operation lock for their whole duration, so they run to completion in
//! arrival order.

mod controller;
mod reconciler;
mod results;
mod state;
mod status;
mod suppress;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use pipewarden_config::Config;

use crate::health::HealthReporter;
use crate::launch::LaunchCatalogue;
use crate::probe::{self, ProbeError};
use crate::registry::{LaunchSpec, ProcessRegistry};

pub use reconciler::{ReconcileOutcome, spawn_reconciler};
pub use results::{
    FAILED_WAITING_FOR_RTSP, NativeReport, ProcessResult, STOPPED, StartReport, StopReport,
    WebReport, WebSwitchFailure,
};
pub use state::{InvalidTransition, Mode, OrchestrationState, Transition, exclusion_holds};
pub use status::{CloudState, CloudStatus, ProcessStatus, StatusSnapshot, evaluate_cloud};
pub use suppress::{ReconcileSuppression, SuppressGuard};

pub(crate) const ORCHESTRATOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::orchestrator");

#[derive(Debug, Default, Clone, Copy)]
struct ControlState {
    mode: Mode,
    state: OrchestrationState,
}

struct Shared {
    config: Config,
    catalogue: LaunchCatalogue,
    registry: ProcessRegistry,
    reporter: Arc<dyn HealthReporter>,
    control: Mutex<ControlState>,
    suppression: Arc<ReconcileSuppression>,
    operation: tokio::sync::Mutex<()>,
}

/// Cloneable handle onto the pipeline controller.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Shared>,
}

impl Orchestrator {
    /// Builds an idle orchestrator in web mode.
    #[must_use]
    pub fn new(
        config: Config,
        registry: ProcessRegistry,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        let catalogue = LaunchCatalogue::new(&config);
        Self {
            inner: Arc::new(Shared {
                config,
                catalogue,
                registry,
                reporter,
                control: Mutex::new(ControlState::default()),
                suppression: Arc::new(ReconcileSuppression::new()),
                operation: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Current output mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.control().mode
    }

    /// Current orchestration state.
    #[must_use]
    pub fn state(&self) -> OrchestrationState {
        self.control().state
    }

    /// Registry the orchestrator drives.
    #[must_use]
    pub fn registry(&self) -> &ProcessRegistry {
        &self.inner.registry
    }

    /// Launch recipes in use.
    #[must_use]
    pub fn catalogue(&self) -> &LaunchCatalogue {
        &self.inner.catalogue
    }

    /// Whether crash reconciliation is currently suppressed.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.inner.suppression.is_set()
    }

    fn control(&self) -> MutexGuard<'_, ControlState> {
        self.inner
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_mode(&self, mode: Mode) {
        self.control().mode = mode;
    }

    fn suppress(&self) -> SuppressGuard {
        self.inner.suppression.hold(self.inner.config.settle_delay())
    }

    /// Applies `transition`, logging and ignoring it when undefined, then
    /// checks the relay/native exclusion.
    fn transition(&self, transition: Transition) {
        let outcome = {
            let mut control = self.control();
            control.state.apply(transition).map(|next| {
                control.state = next;
                next
            })
        };
        match outcome {
            Ok(next) => debug!(
                target: ORCHESTRATOR_TARGET,
                ?transition,
                state = %next,
                "state transition"
            ),
            Err(error) => self.inner.reporter.transition_rejected(&error),
        }
        self.check_exclusion();
    }

    fn check_exclusion(&self) -> bool {
        let mode = self.mode();
        let relay_live = self
            .inner
            .registry
            .is_running(self.inner.catalogue.relay_name());
        let holds = exclusion_holds(mode, relay_live);
        if !holds {
            self.inner.reporter.exclusion_violated(mode);
        }
        holds
    }

    fn launch(&self, spec: &LaunchSpec) -> ProcessResult {
        let result = self.inner.registry.start(spec);
        match &result {
            Ok(outcome) => self
                .inner
                .reporter
                .process_started(spec.name(), outcome.pid()),
            Err(error) => self.inner.reporter.process_failed(spec.name(), error),
        }
        result.into()
    }

    async fn await_upstream(&self) -> Result<(), ProbeError> {
        let config = &self.inner.config;
        let outcome = probe::await_port(
            &config.relay_upstream_host,
            config.relay_upstream_port,
            config.readiness_timeout(),
        )
        .await;
        if let Err(error) = &outcome {
            self.inner.reporter.readiness_timed_out(error);
        }
        outcome
    }

    /// Waits for the relay upstream and starts the relay.
    async fn launch_relay_when_ready(&self) -> ProcessResult {
        match self.await_upstream().await {
            Ok(()) => self.launch(&self.inner.catalogue.relay()),
            Err(_) => ProcessResult::FailedWaitingForRtsp,
        }
    }

    /// Stops the tracked engine and sweeps untracked ones.
    async fn force_stop_engine(&self) {
        let catalogue = &self.inner.catalogue;
        self.inner.registry.stop(catalogue.engine_name());
        self.inner
            .registry
            .kill_matching(catalogue.engine_pattern().as_str())
            .await;
    }

    /// Stops the tracked relay and sweeps untracked ones.
    async fn force_stop_relay(&self) {
        let catalogue = &self.inner.catalogue;
        self.inner.registry.stop(catalogue.relay_name());
        self.inner
            .registry
            .kill_matching(catalogue.relay_pattern().as_str())
            .await;
    }
}
