//! Termination signal handling for the daemon runtime.

use std::io;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::{debug, info};

use super::PROCESS_TARGET;

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the notification source fails.
    fn wait(&self) -> Result<(), ShutdownError>;

    /// Releases a pending [`ShutdownSignal::wait`] without a shutdown
    /// request, e.g. once the control surface has already stopped.
    fn cancel(&self) {}
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener for SIGTERM, SIGINT, SIGQUIT and SIGHUP.
///
/// Handlers are installed by [`SystemShutdownSignal::install`], so a signal
/// delivered before anyone waits is queued rather than killing the daemon.
pub struct SystemShutdownSignal {
    signals: Mutex<Signals>,
    handle: Handle,
    timeout: Duration,
}

impl SystemShutdownSignal {
    /// Installs the handlers and records the drain budget granted to the
    /// runtime once a signal arrives.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] when the handlers cannot be
    /// registered.
    pub fn install(timeout: Duration) -> Result<Self, ShutdownError> {
        let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        let handle = signals.handle();
        Ok(Self {
            signals: Mutex::new(signals),
            handle,
            timeout,
        })
    }

    /// Budget for draining runtime tasks after shutdown begins.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        match signals.forever().next() {
            Some(signal) => info!(
                target: PROCESS_TARGET,
                signal,
                timeout_ms = self.timeout.as_millis(),
                "shutdown signal received"
            ),
            None => debug!(target: PROCESS_TARGET, "signal listener closed"),
        }
        Ok(())
    }

    fn cancel(&self) {
        self.handle.close();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;

    use rstest::rstest;
    use signal_hook::low_level::raise;

    use super::*;

    const WAIT_LIMIT: Duration = Duration::from_secs(5);

    fn wait_in_background(signal: Arc<SystemShutdownSignal>) -> mpsc::Receiver<bool> {
        let (done, finished) = mpsc::channel();
        thread::spawn(move || {
            done.send(signal.wait().is_ok()).expect("receiver alive");
        });
        finished
    }

    #[rstest]
    fn signal_raised_before_waiting_is_not_lost() {
        let signal =
            Arc::new(SystemShutdownSignal::install(Duration::from_secs(1)).expect("install"));
        raise(SIGHUP).expect("raise SIGHUP");

        let finished = wait_in_background(Arc::clone(&signal));

        assert_eq!(finished.recv_timeout(WAIT_LIMIT), Ok(true));
    }

    #[rstest]
    fn cancel_releases_a_blocked_wait() {
        let signal =
            Arc::new(SystemShutdownSignal::install(Duration::from_secs(1)).expect("install"));
        let finished = wait_in_background(Arc::clone(&signal));

        signal.cancel();

        assert_eq!(finished.recv_timeout(WAIT_LIMIT), Ok(true));
    }

    #[rstest]
    fn timeout_budget_is_carried() {
        let signal = SystemShutdownSignal::install(Duration::from_millis(750)).expect("install");
        assert_eq!(signal.timeout(), Duration::from_millis(750));
    }
}
