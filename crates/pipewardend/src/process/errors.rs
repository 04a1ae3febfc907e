//! Defines the unified error surface for daemon launch and supervision.

use std::io;

use thiserror::Error;
use tokio::task::JoinError;

use crate::bootstrap::BootstrapError;
use crate::http::ServeError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The async runtime could not be built.
    #[error("failed to build async runtime: {source}")]
    Runtime {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Bootstrapping the daemon failed.
    #[error("daemon bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// The control surface could not be bound or stopped serving.
    #[error("control surface error: {source}")]
    Serve {
        /// Underlying server error.
        #[source]
        source: ServeError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
    /// A daemon task panicked or was cancelled.
    #[error("daemon task '{task}' did not complete: {source}")]
    Task {
        /// Task label.
        task: &'static str,
        /// Join failure.
        #[source]
        source: JoinError,
    },
    /// The control surface stopped before a shutdown was requested.
    #[error("control surface stopped unexpectedly")]
    ServerStopped,
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<ServeError> for LaunchError {
    fn from(source: ServeError) -> Self {
        Self::Serve { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}
