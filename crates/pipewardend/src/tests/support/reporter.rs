//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::Mutex;

use pipewarden_config::Config;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::orchestrator::{InvalidTransition, Mode};
use crate::probe::ProbeError;
use crate::registry::{ExitEvent, RegistryError};

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ProcessStarted(String),
    ProcessFailed(String),
    ProcessExited { name: String, expected: bool },
    ReadinessTimedOut,
    ModeSwitched(Mode),
    FallbackTriggered(String),
    TransitionRejected(String),
    ExclusionViolated(Mode),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Whether `event` was recorded at least once.
    #[must_use]
    pub fn recorded(&self, event: &HealthEvent) -> bool {
        self.events().contains(event)
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn process_started(&self, name: &str, _pid: u32) {
        self.record(HealthEvent::ProcessStarted(name.to_owned()));
    }

    fn process_failed(&self, name: &str, _error: &RegistryError) {
        self.record(HealthEvent::ProcessFailed(name.to_owned()));
    }

    fn process_exited(&self, event: &ExitEvent) {
        self.record(HealthEvent::ProcessExited {
            name: event.name.clone(),
            expected: event.expected,
        });
    }

    fn readiness_timed_out(&self, _error: &ProbeError) {
        self.record(HealthEvent::ReadinessTimedOut);
    }

    fn mode_switched(&self, mode: Mode) {
        self.record(HealthEvent::ModeSwitched(mode));
    }

    fn fallback_triggered(&self, event: &ExitEvent) {
        self.record(HealthEvent::FallbackTriggered(event.name.clone()));
    }

    fn transition_rejected(&self, error: &InvalidTransition) {
        self.record(HealthEvent::TransitionRejected(error.to_string()));
    }

    fn exclusion_violated(&self, mode: Mode) {
        self.record(HealthEvent::ExclusionViolated(mode));
    }
}
