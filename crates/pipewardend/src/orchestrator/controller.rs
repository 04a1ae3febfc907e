//! Operator-facing operations: start, stop and the two mode switches.

use std::collections::BTreeMap;

use tracing::info;

use super::{
    FAILED_WAITING_FOR_RTSP, Mode, NativeReport, ORCHESTRATOR_TARGET, Orchestrator, STOPPED,
    StartReport, StopReport, Transition, WebReport, WebSwitchFailure,
};

impl Orchestrator {
    /// Brings the pipeline up in the current mode.
    ///
    /// Untracked engine and relay instances are swept first; a tracked
    /// engine is reported as already running. In web mode the relay is
    /// started once the engine's upstream accepts connections. The notifier
    /// always starts last.
    pub async fn start(&self) -> StartReport {
        let _operation = self.inner.operation.lock().await;
        self.transition(Transition::BeginStart);
        let mode = self.mode();
        info!(target: ORCHESTRATOR_TARGET, %mode, "starting pipeline");

        self.sweep_stale(mode).await;

        let catalogue = &self.inner.catalogue;
        let mut results = BTreeMap::new();
        results.insert(
            catalogue.engine_name().to_owned(),
            self.launch(&catalogue.engine(mode)),
        );
        if mode == Mode::Web {
            results.insert(
                catalogue.relay_name().to_owned(),
                self.launch_relay_when_ready().await,
            );
        }
        results.insert(
            catalogue.notifier_name().to_owned(),
            self.launch(&catalogue.notifier()),
        );

        self.transition(Transition::Started(mode));
        StartReport { results }
    }

    /// Stops engine, relay and notifier, then sweeps strays.
    ///
    /// Exits caused by this call never trigger the crash fallback.
    pub async fn stop(&self) -> StopReport {
        let _operation = self.inner.operation.lock().await;
        let _guard = self.suppress();
        self.transition(Transition::BeginStop);
        info!(target: ORCHESTRATOR_TARGET, "stopping pipeline");

        let catalogue = &self.inner.catalogue;
        let stopped = catalogue
            .pipeline_names()
            .into_iter()
            .map(|name| (name.to_owned(), self.inner.registry.stop(name)))
            .collect();
        self.force_stop_engine().await;
        self.force_stop_relay().await;

        self.transition(Transition::Stopped);
        StopReport { stopped }
    }

    /// Switches to local display output: relay and engine down, native
    /// engine up, relay left off.
    pub async fn switch_to_native(&self) -> NativeReport {
        let _operation = self.inner.operation.lock().await;
        let _guard = self.suppress();
        self.transition(Transition::BeginSwitch(Mode::Native));
        self.set_mode(Mode::Native);
        info!(target: ORCHESTRATOR_TARGET, "switching to native output");

        self.force_stop_relay().await;
        self.force_stop_engine().await;
        let catalogue = &self.inner.catalogue;
        let started = self.launch(&catalogue.engine(Mode::Native));

        self.transition(Transition::Switched(Mode::Native));
        self.inner.reporter.mode_switched(Mode::Native);
        NativeReport {
            native_mode: true,
            stopped: BTreeMap::from([
                (catalogue.relay_name().to_owned(), STOPPED),
                (catalogue.engine_name().to_owned(), STOPPED),
            ]),
            started,
        }
    }

    /// Switches back to browser output: engine restarted with the web
    /// configuration, relay started once its upstream is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`WebSwitchFailure`] when the upstream never came up. The
    /// switch still settles on web mode with the engine running and the
    /// relay down.
    pub async fn switch_to_web(&self) -> Result<WebReport, WebSwitchFailure> {
        let _operation = self.inner.operation.lock().await;
        let _guard = self.suppress();
        self.transition(Transition::BeginSwitch(Mode::Web));
        self.set_mode(Mode::Web);
        info!(target: ORCHESTRATOR_TARGET, "switching to web output");

        self.force_stop_engine().await;
        let catalogue = &self.inner.catalogue;
        let started = self.launch(&catalogue.engine(Mode::Web));

        if self.await_upstream().await.is_err() {
            self.transition(Transition::Switched(Mode::Web));
            self.inner.reporter.mode_switched(Mode::Web);
            return Err(WebSwitchFailure {
                native_mode: false,
                stopped: STOPPED,
                started,
                error: FAILED_WAITING_FOR_RTSP,
            });
        }
        let started_relay = self.launch(&catalogue.relay());

        self.transition(Transition::Switched(Mode::Web));
        self.inner.reporter.mode_switched(Mode::Web);
        Ok(WebReport {
            native_mode: false,
            stopped: STOPPED,
            started,
            started_relay,
        })
    }

    async fn sweep_stale(&self, mode: Mode) {
        let catalogue = &self.inner.catalogue;
        let registry = &self.inner.registry;
        if !registry.is_running(catalogue.engine_name()) {
            registry
                .kill_matching(catalogue.engine_pattern().as_str())
                .await;
        }
        if !registry.is_running(catalogue.relay_name()) {
            registry
                .kill_matching(catalogue.relay_pattern().as_str())
                .await;
        } else if mode.is_native() {
            registry.stop(catalogue.relay_name());
        }
    }
}
