//! Failures surfaced while starting supervised processes.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors reported by [`super::ProcessRegistry::start`].
///
/// Every variant is fatal to the start attempt it came from and to nothing
/// else; callers decide whether to retry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The log directory could not be created.
    #[error("failed to prepare log directory '{path}': {source}")]
    LogDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A stdout or stderr sink could not be opened for appending.
    #[error("failed to open log sink '{path}' for '{name}': {source}")]
    LogSink {
        /// Registry name of the process.
        name: String,
        /// Log file that could not be opened.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The OS refused to spawn the process.
    #[error("failed to spawn '{name}' via '{command}': {source}")]
    Spawn {
        /// Registry name of the process.
        name: String,
        /// Command that was executed.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The child was spawned but exposed no pid.
    #[error("spawned '{name}' but no pid was reported")]
    MissingPid {
        /// Registry name of the process.
        name: String,
    },
}
