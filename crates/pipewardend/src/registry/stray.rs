//! Sweeps processes left behind by an earlier daemon instance.

use tokio::process::Command;
use tracing::{debug, warn};

use super::REGISTRY_TARGET;

/// Runs `pkill -f <pattern>`; failures and "no match" are logged only.
pub(super) async fn kill_matching(pattern: &str) {
    match Command::new("pkill").arg("-f").arg(pattern).status().await {
        Ok(status) if status.success() => {
            debug!(target: REGISTRY_TARGET, pattern, "stray processes signalled");
        }
        Ok(status) => {
            debug!(
                target: REGISTRY_TARGET,
                pattern,
                code = ?status.code(),
                "no stray processes matched"
            );
        }
        Err(error) => {
            warn!(target: REGISTRY_TARGET, pattern, %error, "stray sweep unavailable");
        }
    }
}
