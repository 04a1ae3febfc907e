//! Daemon launch sequencing and runtime orchestration.

use std::sync::Arc;

use tokio::runtime::Builder;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::http;
use crate::orchestrator::{ProcessResult, spawn_reconciler};

use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{PROCESS_TARGET, SHUTDOWN_TIMEOUT};

/// Runs the daemon using the production collaborators.
///
/// Installs the signal handlers before anything else, builds the
/// multi-threaded runtime, serves until a termination signal arrives, then
/// terminates every supervised process.
///
/// # Errors
///
/// Returns [`LaunchError`] when the runtime, bootstrap, control surface or
/// signal handling fails.
pub fn run_daemon() -> Result<(), LaunchError> {
    let shutdown = SystemShutdownSignal::install(SHUTDOWN_TIMEOUT)?;
    let drain_budget = shutdown.timeout();
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| LaunchError::Runtime { source })?;
    let reporter: Arc<dyn HealthReporter> = Arc::new(StructuredHealthReporter::new());
    let result = runtime.block_on(run_daemon_with(
        &SystemConfigLoader,
        reporter,
        shutdown,
    ));
    runtime.shutdown_timeout(drain_budget);
    result
}

/// Runs the daemon with injected collaborators.
pub(crate) async fn run_daemon_with<S>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: S,
) -> Result<(), LaunchError>
where
    S: ShutdownSignal + 'static,
{
    info!(target: PROCESS_TARGET, "starting daemon runtime");
    let daemon = bootstrap_with(loader, reporter)?;
    let listener = http::bind(&daemon.config().listen_address()).await?;
    let orchestrator = daemon.orchestrator().clone();

    let reconciler = spawn_reconciler(orchestrator.clone());
    for (name, result) in daemon.start_background_services() {
        if let ProcessResult::Failed { error } = result {
            warn!(target: PROCESS_TARGET, service = %name, %error, "background service unavailable");
        }
    }

    let (stop_server, server_stopped) = oneshot::channel::<()>();
    let mut server = tokio::spawn(http::serve(listener, orchestrator.clone(), async move {
        if server_stopped.await.is_err() {
            debug!(target: PROCESS_TARGET, "shutdown sender dropped");
        }
    }));
    let shutdown = Arc::new(shutdown);
    let listener_signal = Arc::clone(&shutdown);
    let waiter = tokio::task::spawn_blocking(move || listener_signal.wait());

    let outcome = tokio::select! {
        waited = waiter => {
            let waited = waited
                .map_err(|source| LaunchError::Task { task: "shutdown", source })
                .and_then(|result| result.map_err(LaunchError::from));
            if stop_server.send(()).is_err() {
                warn!(target: PROCESS_TARGET, "control surface already stopped");
            }
            let served = match server.await {
                Ok(result) => result.map_err(LaunchError::from),
                Err(source) => Err(LaunchError::Task { task: "server", source }),
            };
            waited.and(served)
        }
        served = &mut server => {
            shutdown.cancel();
            match served {
                Ok(Ok(())) => Err(LaunchError::ServerStopped),
                Ok(Err(error)) => Err(error.into()),
                Err(source) => Err(LaunchError::Task { task: "server", source }),
            }
        }
    };

    reconciler.abort();
    let terminated = orchestrator.registry().terminate_all();
    info!(
        target: PROCESS_TARGET,
        terminated = ?terminated,
        "shutdown sequence completed"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::Mutex;
    use std::sync::mpsc::{self, Receiver, Sender};

    use rstest::rstest;

    use pipewarden_config::Config;

    use crate::bootstrap::StaticConfigLoader;
    use crate::process::ShutdownError;
    use crate::tests::support::{
        FailingConfigLoader, HealthEvent, PipelineSandbox, RecordingHealthReporter, Upstream,
    };

    use super::*;

    struct ManualShutdown {
        trigger: Mutex<Receiver<()>>,
    }

    impl ManualShutdown {
        fn new() -> (Sender<()>, Self) {
            let (sender, receiver) = mpsc::channel();
            (
                sender,
                Self {
                    trigger: Mutex::new(receiver),
                },
            )
        }
    }

    impl ShutdownSignal for ManualShutdown {
        fn wait(&self) -> Result<(), ShutdownError> {
            let trigger = self.trigger.lock().expect("trigger mutex poisoned");
            // A dropped sender counts as a shutdown request.
            match trigger.recv() {
                Ok(()) | Err(_) => Ok(()),
            }
        }
    }

    fn sandbox_config(sandbox: &PipelineSandbox, port: u16) -> Config {
        Config {
            listen_port: port,
            ..sandbox.config.clone()
        }
    }

    #[rstest]
    #[tokio::test]
    async fn starts_background_services_and_stops_on_signal() {
        let sandbox = PipelineSandbox::new(Upstream::Closed);
        let loader = StaticConfigLoader::new(sandbox_config(&sandbox, 0));
        let reporter = Arc::new(RecordingHealthReporter::default());
        let (trigger, shutdown) = ManualShutdown::new();
        trigger.send(()).expect("queue shutdown");

        run_daemon_with(&loader, reporter.clone(), shutdown)
            .await
            .expect("daemon run");

        assert!(reporter.recorded(&HealthEvent::BootstrapSucceeded));
        for service in ["data_manager", "telemetry", "relay_emulator"] {
            assert!(
                reporter.recorded(&HealthEvent::ProcessStarted(service.to_owned())),
                "{service} not started: {:?}",
                reporter.events()
            );
        }
    }

    #[rstest]
    #[tokio::test]
    async fn occupied_listen_port_fails_launch() {
        let sandbox = PipelineSandbox::new(Upstream::Closed);
        let occupied = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = occupied.local_addr().expect("addr").port();
        let loader = StaticConfigLoader::new(sandbox_config(&sandbox, port));
        let (_trigger, shutdown) = ManualShutdown::new();

        let error = run_daemon_with(&loader, Arc::new(RecordingHealthReporter::default()), shutdown)
            .await
            .expect_err("bind should fail");

        assert!(matches!(
            error,
            LaunchError::Serve {
                source: http::ServeError::Bind { .. }
            }
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn configuration_failure_is_reported() {
        let reporter = Arc::new(RecordingHealthReporter::default());
        let (_trigger, shutdown) = ManualShutdown::new();

        let error = run_daemon_with(&FailingConfigLoader, reporter.clone(), shutdown)
            .await
            .expect_err("bootstrap should fail");

        assert!(matches!(error, LaunchError::Bootstrap { .. }));
        assert!(
            reporter
                .events()
                .iter()
                .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)))
        );
    }
}
