//! Test harness utilities for the daemon suites.

mod config_loader;
mod pipeline;
mod reporter;

pub use config_loader::FailingConfigLoader;
pub use pipeline::{
    NATIVE_ENGINE_COMMAND, PipelineSandbox, Upstream, WEB_ENGINE_COMMAND, eventually, refused_port,
};
pub use reporter::{HealthEvent, RecordingHealthReporter};
