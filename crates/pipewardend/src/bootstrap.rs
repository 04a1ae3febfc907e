//! Daemon bootstrap: configuration, telemetry, log directory and the
//! orchestrator wiring.

use std::fs;
use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::OrthoError;
use thiserror::Error;

use pipewarden_config::Config;

use crate::health::HealthReporter;
use crate::orchestrator::{Orchestrator, ProcessResult};
use crate::registry::ProcessRegistry;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already-loaded configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The process log directory could not be created.
    #[error("failed to prepare log directory '{path}': {source}")]
    LogDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    orchestrator: Orchestrator,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Pipeline controller shared with the control surface.
    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Starts the forwarder, telemetry publisher and actuator emulator.
    ///
    /// Failures are reported and returned per service; none is fatal.
    pub fn start_background_services(&self) -> Vec<(String, ProcessResult)> {
        let registry = self.orchestrator.registry();
        self.orchestrator
            .catalogue()
            .background_services()
            .iter()
            .map(|spec| {
                let result = registry.start(spec);
                match &result {
                    Ok(outcome) => self.reporter.process_started(spec.name(), outcome.pid()),
                    Err(error) => self.reporter.process_failed(spec.name(), error),
                }
                (spec.name().to_owned(), ProcessResult::from(result))
            })
            .collect()
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration, telemetry or the log
/// directory cannot be prepared. Every failure is also reported.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let log_dir = config.resolved_log_dir();
    if let Err(source) = fs::create_dir_all(&log_dir) {
        let error = BootstrapError::LogDirectory {
            path: log_dir,
            source,
        };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    let registry = ProcessRegistry::new(log_dir);
    let orchestrator = Orchestrator::new(config.clone(), registry, Arc::clone(&reporter));
    reporter.bootstrap_succeeded(&config);

    Ok(Daemon {
        config,
        orchestrator,
        telemetry,
        reporter,
    })
}
