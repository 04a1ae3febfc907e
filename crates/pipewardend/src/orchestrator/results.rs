//! Report types returned by orchestrator operations.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::registry::{RegistryError, StartOutcome, StopOutcome};

/// Marker string used wherever a report lists a forced stop.
pub const STOPPED: &str = "stopped";

/// Error label reported when the relay upstream never came up.
pub const FAILED_WAITING_FOR_RTSP: &str = "failed_waiting_for_rtsp";

/// Per-process outcome of a launch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessResult {
    /// A new instance was spawned.
    Started {
        /// OS pid.
        pid: u32,
    },
    /// An instance was already live.
    AlreadyRunning {
        /// OS pid.
        pid: u32,
    },
    /// Spawning failed.
    Failed {
        /// Human-readable cause.
        error: String,
    },
    /// The relay was not started because its upstream never became ready.
    FailedWaitingForRtsp,
}

impl ProcessResult {
    /// Pid of the live instance, if any.
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        match self {
            Self::Started { pid } | Self::AlreadyRunning { pid } => Some(*pid),
            Self::Failed { .. } | Self::FailedWaitingForRtsp => None,
        }
    }
}

impl From<StartOutcome> for ProcessResult {
    fn from(outcome: StartOutcome) -> Self {
        match outcome {
            StartOutcome::Started { pid } => Self::Started { pid },
            StartOutcome::AlreadyRunning { pid } => Self::AlreadyRunning { pid },
        }
    }
}

impl From<Result<StartOutcome, RegistryError>> for ProcessResult {
    fn from(result: Result<StartOutcome, RegistryError>) -> Self {
        match result {
            Ok(outcome) => outcome.into(),
            Err(error) => Self::Failed {
                error: error.to_string(),
            },
        }
    }
}

/// Result of the start operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartReport {
    /// Outcome per process name.
    pub results: BTreeMap<String, ProcessResult>,
}

/// Result of the stop operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopReport {
    /// Outcome per process name.
    pub stopped: BTreeMap<String, StopOutcome>,
}

/// Result of switching to native output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeReport {
    /// Always true once the switch ran.
    pub native_mode: bool,
    /// Relay and engine, both forced down.
    pub stopped: BTreeMap<String, &'static str>,
    /// Outcome of launching the native engine.
    pub started: ProcessResult,
}

/// Result of switching back to web output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebReport {
    /// Always false once the switch ran.
    pub native_mode: bool,
    /// The engine was forced down.
    pub stopped: &'static str,
    /// Outcome of launching the web engine.
    pub started: ProcessResult,
    /// Outcome of launching the relay.
    #[serde(rename = "startedMediamtx")]
    pub started_relay: ProcessResult,
}

/// Switch to web output whose relay upstream never became ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSwitchFailure {
    /// Mode after the attempt; web even though the relay is down.
    pub native_mode: bool,
    /// The engine was forced down.
    pub stopped: &'static str,
    /// Outcome of launching the web engine.
    pub started: ProcessResult,
    /// Always [`FAILED_WAITING_FOR_RTSP`].
    pub error: &'static str,
}
