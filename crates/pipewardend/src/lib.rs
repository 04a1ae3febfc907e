//! Supervision daemon for the video-analytics pipeline.
//!
//! The daemon keeps an inference engine, a media relay and a handful of
//! helper daemons alive as opaque child processes, and exposes a small
//! HTTP/JSON control surface for a browser dashboard. Configuration is
//! resolved through [`pipewarden_config`].
//!
//! ## Output modes
//!
//! The pipeline runs in one of two mutually exclusive modes:
//!
//! 1. **Web**: the engine publishes an RTSP stream that the relay serves to
//!    browsers. The relay is only started once the engine's hand-off port
//!    accepts connections.
//!
//! 2. **Native**: the engine renders to the local display and the relay
//!    stays down.
//!
//! If the engine dies unexpectedly while native output is active, the
//! reconciler restores web output on its own. Exits caused by the daemon's
//! own stop and switch operations are never treated as crashes.

mod bootstrap;
mod health;
pub mod http;
pub mod launch;
pub mod orchestrator;
pub mod probe;
mod process;
pub mod registry;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
