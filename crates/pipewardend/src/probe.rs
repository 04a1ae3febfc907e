//! TCP readiness polling.

use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info};

const PROBE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::probe");

/// Pause between connection attempts.
pub const RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound on a single connection attempt.
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors reported by [`await_port`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The endpoint never accepted a connection within the allowance.
    #[error("{host}:{port} did not accept connections within {timeout_ms} ms")]
    DeadlineExceeded {
        /// Probed host.
        host: String,
        /// Probed port.
        port: u16,
        /// Allowance that elapsed.
        timeout_ms: u128,
    },
}

/// Waits until `host:port` accepts a TCP connection.
///
/// Connection refusals, resolution failures and attempts exceeding
/// [`ATTEMPT_TIMEOUT`] all count as failed attempts. The deadline is checked
/// after each failure, so the call returns no earlier than `deadline` and at
/// most one retry interval plus one attempt later.
///
/// # Errors
///
/// Returns [`ProbeError::DeadlineExceeded`] once more than `deadline` has
/// elapsed without a successful connection.
pub async fn await_port(host: &str, port: u16, deadline: Duration) -> Result<(), ProbeError> {
    let started = Instant::now();
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        match timeout(ATTEMPT_TIMEOUT, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => {
                info!(
                    target: PROBE_TARGET,
                    host,
                    port,
                    attempts,
                    elapsed_ms = started.elapsed().as_millis(),
                    "endpoint ready"
                );
                return Ok(());
            }
            Ok(Err(error)) => {
                debug!(target: PROBE_TARGET, host, port, attempts, %error, "connect failed");
            }
            Err(_) => {
                debug!(target: PROBE_TARGET, host, port, attempts, "connect attempt timed out");
            }
        }
        if started.elapsed() > deadline {
            return Err(ProbeError::DeadlineExceeded {
                host: host.to_owned(),
                port,
                timeout_ms: deadline.as_millis(),
            });
        }
        sleep(RETRY_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use rstest::rstest;

    use super::*;

    fn refused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);
        port
    }

    #[rstest]
    #[tokio::test]
    async fn returns_once_listener_accepts() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();

        await_port("127.0.0.1", port, Duration::from_secs(2))
            .await
            .expect("listener should be reachable");
    }

    #[rstest]
    #[tokio::test]
    async fn waits_for_a_late_listener() {
        let port = refused_port();
        let binder = tokio::spawn(async move {
            sleep(Duration::from_millis(700)).await;
            tokio::net::TcpListener::bind(("127.0.0.1", port)).await
        });

        let outcome = await_port("127.0.0.1", port, Duration::from_secs(5)).await;
        let listener = binder.await.expect("binder task");
        if listener.is_ok() {
            assert_eq!(outcome, Ok(()));
        }
    }

    #[rstest]
    #[case(Duration::ZERO)]
    #[case(Duration::from_millis(800))]
    #[tokio::test]
    async fn refusing_target_fails_within_bounds(#[case] deadline: Duration) {
        let port = refused_port();
        let started = Instant::now();

        let error = await_port("127.0.0.1", port, deadline)
            .await
            .expect_err("port should stay closed");

        let elapsed = started.elapsed();
        assert!(elapsed >= deadline, "returned early after {elapsed:?}");
        assert!(
            elapsed <= deadline + RETRY_INTERVAL + ATTEMPT_TIMEOUT,
            "returned late after {elapsed:?}"
        );
        assert!(matches!(error, ProbeError::DeadlineExceeded { port: p, .. } if p == port));
    }

    #[rstest]
    #[tokio::test]
    async fn unresolvable_host_counts_as_failure() {
        let error = await_port("host.invalid", 8554, Duration::ZERO).await;
        assert!(error.is_err());
    }
}
