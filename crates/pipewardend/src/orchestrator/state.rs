//! Output modes and the orchestration state machine.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Mutually exclusive output modes of the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Engine publishes RTSP; the relay serves it to browsers.
    #[default]
    Web,
    /// Engine renders to the local display; the relay must be down.
    Native,
}

impl Mode {
    /// Lowercase label used in logs and state strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Native => "native",
        }
    }

    /// Whether the mode renders locally.
    #[must_use]
    pub const fn is_native(self) -> bool {
        matches!(self, Self::Native)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle position of the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrchestrationState {
    /// Nothing has been requested since launch.
    #[default]
    Idle,
    /// A start operation is in progress.
    Starting,
    /// The pipeline was brought up in the given mode.
    Running(Mode),
    /// A switch towards the given mode is in progress.
    Switching(Mode),
    /// A stop operation is in progress.
    Stopping,
    /// The pipeline was stopped by an operator.
    Stopped,
}

/// Events that move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A start operation began.
    BeginStart,
    /// A start operation finished in the given mode.
    Started(Mode),
    /// A stop operation began.
    BeginStop,
    /// A stop operation finished.
    Stopped,
    /// An operator switch towards the given mode began.
    BeginSwitch(Mode),
    /// A switch towards the given mode finished.
    Switched(Mode),
    /// The engine died in native mode and web output is being restored.
    Fallback,
}

/// A transition that is not defined for the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("transition {transition:?} is not valid from state '{from}'")]
pub struct InvalidTransition {
    /// State the machine was in.
    pub from: OrchestrationState,
    /// Rejected transition.
    pub transition: Transition,
}

impl OrchestrationState {
    /// Computes the successor state.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when `transition` is undefined from
    /// `self`; the caller keeps the current state.
    pub fn apply(self, transition: Transition) -> Result<Self, InvalidTransition> {
        use OrchestrationState as S;
        use Transition as T;

        match (self, transition) {
            (_, T::BeginStart) => Ok(S::Starting),
            (S::Starting, T::Started(mode)) => Ok(S::Running(mode)),
            (_, T::BeginStop) => Ok(S::Stopping),
            (S::Stopping, T::Stopped) => Ok(S::Stopped),
            (_, T::BeginSwitch(mode)) => Ok(S::Switching(mode)),
            (S::Switching(target), T::Switched(mode)) if target == mode => Ok(S::Running(mode)),
            (S::Idle | S::Stopped | S::Stopping, T::Fallback) => Err(InvalidTransition {
                from: self,
                transition,
            }),
            (_, T::Fallback) => Ok(S::Switching(Mode::Web)),
            _ => Err(InvalidTransition {
                from: self,
                transition,
            }),
        }
    }
}

impl fmt::Display for OrchestrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Starting => f.write_str("starting"),
            Self::Running(mode) => write!(f, "running:{mode}"),
            Self::Switching(mode) => write!(f, "switching:{mode}"),
            Self::Stopping => f.write_str("stopping"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

impl Serialize for OrchestrationState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Whether the relay/native mutual exclusion holds.
#[must_use]
pub const fn exclusion_holds(mode: Mode, relay_live: bool) -> bool {
    !(mode.is_native() && relay_live)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(OrchestrationState::Idle, "idle")]
    #[case(OrchestrationState::Running(Mode::Native), "running:native")]
    #[case(OrchestrationState::Switching(Mode::Web), "switching:web")]
    #[case(OrchestrationState::Stopped, "stopped")]
    fn states_serialise_as_labels(#[case] state: OrchestrationState, #[case] label: &str) {
        assert_eq!(
            serde_json::to_value(state).expect("serialise"),
            serde_json::Value::from(label)
        );
    }

    #[rstest]
    #[case(OrchestrationState::Starting, Transition::Stopped)]
    #[case(OrchestrationState::Idle, Transition::Started(Mode::Web))]
    #[case(OrchestrationState::Stopping, Transition::Fallback)]
    #[case(OrchestrationState::Running(Mode::Web), Transition::Switched(Mode::Web))]
    fn undefined_transitions_are_rejected(
        #[case] from: OrchestrationState,
        #[case] transition: Transition,
    ) {
        assert_eq!(
            from.apply(transition),
            Err(InvalidTransition { from, transition })
        );
    }

    #[rstest]
    #[case(Mode::Web, true, true)]
    #[case(Mode::Native, false, true)]
    #[case(Mode::Native, true, false)]
    fn relay_is_excluded_from_native_mode(
        #[case] mode: Mode,
        #[case] relay_live: bool,
        #[case] holds: bool,
    ) {
        assert_eq!(exclusion_holds(mode, relay_live), holds);
    }
}
