//! Structured health reporting for daemon and pipeline lifecycle events.

use std::sync::Arc;

use pipewarden_config::Config;

use crate::bootstrap::BootstrapError;
use crate::orchestrator::{InvalidTransition, Mode};
use crate::probe::ProbeError;
use crate::registry::{ExitEvent, RegistryError};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after a supervised process was spawned.
    fn process_started(&self, name: &str, pid: u32);

    /// Invoked when a supervised process could not be spawned.
    fn process_failed(&self, name: &str, error: &RegistryError);

    /// Invoked for every supervised process exit.
    fn process_exited(&self, event: &ExitEvent);

    /// Invoked when the relay upstream did not come up in time.
    fn readiness_timed_out(&self, error: &ProbeError);

    /// Invoked after an operator switch settled on `mode`.
    fn mode_switched(&self, mode: Mode);

    /// Invoked when a native-mode engine crash triggers the web fallback.
    fn fallback_triggered(&self, event: &ExitEvent);

    /// Invoked when a state transition was rejected.
    fn transition_rejected(&self, error: &InvalidTransition);

    /// Invoked when the relay is live while the mode is native.
    fn exclusion_violated(&self, mode: Mode);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn process_started(&self, name: &str, pid: u32) {
        (**self).process_started(name, pid);
    }

    fn process_failed(&self, name: &str, error: &RegistryError) {
        (**self).process_failed(name, error);
    }

    fn process_exited(&self, event: &ExitEvent) {
        (**self).process_exited(event);
    }

    fn readiness_timed_out(&self, error: &ProbeError) {
        (**self).readiness_timed_out(error);
    }

    fn mode_switched(&self, mode: Mode) {
        (**self).mode_switched(mode);
    }

    fn fallback_triggered(&self, event: &ExitEvent) {
        (**self).fallback_triggered(event);
    }

    fn transition_rejected(&self, error: &InvalidTransition) {
        (**self).transition_rejected(error);
    }

    fn exclusion_violated(&self, mode: Mode) {
        (**self).exclusion_violated(mode);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            listen = %config.listen_address(),
            base_dir = %config.base_dir,
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn process_started(&self, name: &str, pid: u32) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "process_started",
            process = name,
            pid,
            "supervised process started"
        );
    }

    fn process_failed(&self, name: &str, error: &RegistryError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "process_failed",
            process = name,
            error = %error,
            "supervised process failed to start"
        );
    }

    fn process_exited(&self, event: &ExitEvent) {
        if event.expected {
            tracing::info!(
                target: HEALTH_TARGET,
                event = "process_exited",
                process = %event.name,
                pid = event.pid,
                code = ?event.code,
                signal = ?event.signal,
                "supervised process exited after stop"
            );
        } else {
            tracing::warn!(
                target: HEALTH_TARGET,
                event = "process_exited",
                process = %event.name,
                pid = event.pid,
                code = ?event.code,
                signal = ?event.signal,
                "supervised process exited unexpectedly"
            );
        }
    }

    fn readiness_timed_out(&self, error: &ProbeError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "readiness_timed_out",
            error = %error,
            "relay upstream not ready"
        );
    }

    fn mode_switched(&self, mode: Mode) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "mode_switched",
            mode = %mode,
            "output mode switched"
        );
    }

    fn fallback_triggered(&self, event: &ExitEvent) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "fallback_triggered",
            process = %event.name,
            pid = event.pid,
            "native engine died; restoring web output"
        );
    }

    fn transition_rejected(&self, error: &InvalidTransition) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "transition_rejected",
            from = %error.from,
            transition = ?error.transition,
            "orchestration transition rejected"
        );
    }

    fn exclusion_violated(&self, mode: Mode) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "exclusion_violated",
            mode = %mode,
            "relay is live while native output is active"
        );
    }
}
