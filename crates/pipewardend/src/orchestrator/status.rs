//! Point-in-time health snapshot of the pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::time::{Duration, SystemTime};

use camino::Utf8Path;
use serde::Serialize;
use tracing::debug;

use super::{ORCHESTRATOR_TARGET, OrchestrationState, Orchestrator};

/// Liveness of the cloud reporting path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudState {
    /// Reporting is enabled and the heartbeat is fresh.
    On,
    /// Reporting is disabled.
    Off,
    /// Reporting is enabled but the forwarder or its heartbeat is unhealthy.
    Error,
}

/// Cloud section of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudStatus {
    /// Provider label.
    pub provider: String,
    /// Derived state.
    pub status: CloudState,
}

/// A live pipeline process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessStatus {
    /// OS pid.
    pub pid: u32,
}

/// Body of the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Live pipeline processes; background services are never listed.
    pub running: BTreeMap<String, ProcessStatus>,
    /// Cloud reporting health.
    pub cloud: CloudStatus,
    /// Whether native output is active.
    pub native_mode: bool,
    /// Orchestration state.
    pub state: OrchestrationState,
}

/// Derives the cloud state from the forwarder's liveness and heartbeat age.
///
/// `heartbeat_age` is `None` when the heartbeat file is missing or
/// unreadable.
#[must_use]
pub fn evaluate_cloud(
    enabled: bool,
    forwarder_live: bool,
    heartbeat_age: Option<Duration>,
    ttl: Duration,
) -> CloudState {
    if !enabled {
        return CloudState::Off;
    }
    if !forwarder_live {
        return CloudState::Error;
    }
    match heartbeat_age {
        Some(age) if age <= ttl => CloudState::On,
        _ => CloudState::Error,
    }
}

/// Age of the heartbeat file's last modification. A modification time in
/// the future counts as fresh.
pub(crate) fn heartbeat_age(path: &Utf8Path, now: SystemTime) -> Option<Duration> {
    let modified = match fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(modified) => modified,
        Err(error) => {
            debug!(target: ORCHESTRATOR_TARGET, path = %path, %error, "heartbeat unreadable");
            return None;
        }
    };
    Some(now.duration_since(modified).unwrap_or(Duration::ZERO))
}

impl Orchestrator {
    /// Snapshot of pipeline liveness, cloud health, mode and state.
    #[must_use]
    pub fn status(&self) -> StatusSnapshot {
        let config = &self.inner.config;
        let catalogue = &self.inner.catalogue;
        let registry = &self.inner.registry;

        let running = catalogue
            .pipeline_names()
            .into_iter()
            .filter_map(|name| {
                registry
                    .pid(name)
                    .map(|pid| (name.to_owned(), ProcessStatus { pid }))
            })
            .collect();

        let forwarder_live = registry.is_running(catalogue.forwarder_name());
        let age = if config.cloud_enabled && forwarder_live {
            heartbeat_age(&config.resolved_heartbeat_path(), SystemTime::now())
        } else {
            None
        };
        let status = evaluate_cloud(
            config.cloud_enabled,
            forwarder_live,
            age,
            config.heartbeat_ttl(),
        );

        let control = *self.control();
        StatusSnapshot {
            running,
            cloud: CloudStatus {
                provider: config.cloud_provider.clone(),
                status,
            },
            native_mode: control.mode.is_native(),
            state: control.state,
        }
    }
}
