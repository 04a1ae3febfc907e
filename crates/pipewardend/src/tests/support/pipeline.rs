//! Sandboxed pipeline whose engine, relay and helpers are shell stand-ins.
//!
//! The engine and relay binaries are symlinks to `/bin/sh` inside a
//! temporary directory, so stray sweeps only ever match processes owned by
//! the sandbox. The engine's `-c <config>` arguments therefore run the
//! configured command string, and the relay reads its configuration file as
//! a script.

use std::fs;
use std::net::TcpListener;
use std::os::unix::fs::symlink;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tempfile::TempDir;

use pipewarden_config::Config;

use crate::orchestrator::Orchestrator;
use crate::registry::ProcessRegistry;

use super::RecordingHealthReporter;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const POLL_LIMIT: Duration = Duration::from_secs(5);

/// Command the engine stand-in runs for its web configuration.
pub const WEB_ENGINE_COMMAND: &str = "/bin/sleep 30";

/// Command the engine stand-in runs for its native configuration.
pub const NATIVE_ENGINE_COMMAND: &str = "/bin/sleep 31";

/// Whether the relay upstream accepts connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Open,
    Closed,
}

/// Orchestrator wired to stand-in processes under a temporary directory.
pub struct PipelineSandbox {
    _dir: TempDir,
    _upstream: Option<TcpListener>,
    pub root: Utf8PathBuf,
    pub config: Config,
    pub reporter: Arc<RecordingHealthReporter>,
    pub orchestrator: Orchestrator,
}

impl PipelineSandbox {
    pub fn new(upstream: Upstream) -> Self {
        Self::with_config(upstream, |_| {})
    }

    pub fn with_config(upstream: Upstream, adjust: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        let bin = root.join("bin");
        fs::create_dir_all(&bin).expect("bin dir");
        symlink("/bin/sh", bin.join("engine")).expect("engine stand-in");
        symlink("/bin/sh", bin.join("relay")).expect("relay stand-in");
        for script in ["relay.sh", "notifier.sh", "forwarder.sh", "telemetry.sh", "emulator.sh"] {
            fs::write(root.join(script), "exec sleep 30\n").expect("helper script");
        }

        let (listener, port) = match upstream {
            Upstream::Open => {
                let listener = TcpListener::bind("127.0.0.1:0").expect("bind upstream");
                let port = listener.local_addr().expect("upstream addr").port();
                (Some(listener), port)
            }
            Upstream::Closed => (None, refused_port()),
        };

        let mut config = Config {
            base_dir: root.clone(),
            log_dir: root.join("logs"),
            engine_binary: bin.join("engine"),
            engine_workdir: root.clone(),
            engine_web_config: Utf8PathBuf::from(WEB_ENGINE_COMMAND),
            engine_native_config: Utf8PathBuf::from(NATIVE_ENGINE_COMMAND),
            relay_binary: bin.join("relay"),
            relay_config: root.join("relay.sh"),
            relay_workdir: root.clone(),
            relay_upstream_host: String::from("127.0.0.1"),
            relay_upstream_port: port,
            readiness_timeout_ms: 300,
            settle_delay_ms: 50,
            helper_interpreter: String::from("/bin/sh"),
            notifier_script: root.join("notifier.sh"),
            forwarder_script: root.join("forwarder.sh"),
            telemetry_script: root.join("telemetry.sh"),
            emulator_script: root.join("emulator.sh"),
            heartbeat_path: root.join("heartbeat.json"),
            ..Config::default()
        };
        adjust(&mut config);

        let reporter = Arc::new(RecordingHealthReporter::default());
        let registry = ProcessRegistry::new(config.resolved_log_dir());
        let orchestrator = Orchestrator::new(config.clone(), registry, reporter.clone());
        Self {
            _dir: dir,
            _upstream: listener,
            root,
            config,
            reporter,
            orchestrator,
        }
    }

    pub fn registry(&self) -> &ProcessRegistry {
        self.orchestrator.registry()
    }

    pub fn engine_pid(&self) -> Option<u32> {
        self.registry().pid(&self.config.engine_name)
    }

    pub fn relay_running(&self) -> bool {
        self.registry().is_running(&self.config.relay_name)
    }

    /// Command line of the tracked engine once it has exec'd its stand-in.
    pub async fn engine_command_line(&self) -> String {
        let pid = self.engine_pid().expect("engine should be running");
        let path = format!("/proc/{pid}/cmdline");
        let mut command_line = String::new();
        let found = eventually(|| {
            command_line = fs::read(&path)
                .map(|raw| String::from_utf8_lossy(&raw).replace('\0', " "))
                .unwrap_or_default();
            command_line.contains("/bin/sleep")
        })
        .await;
        assert!(found, "engine {pid} never ran its stand-in: {command_line:?}");
        command_line
    }

    /// Kills the tracked engine as if it crashed.
    pub fn crash_engine(&self) -> u32 {
        let pid = self.engine_pid().expect("engine should be running");
        let raw = i32::try_from(pid).expect("pid fits i32");
        kill(Pid::from_raw(raw), Signal::SIGKILL).expect("kill engine");
        pid
    }

    /// Waits until the suppress flag from the last operation has settled.
    pub async fn settle(&self) {
        let orchestrator = self.orchestrator.clone();
        assert!(
            eventually(move || !orchestrator.is_suppressed()).await,
            "suppress flag never cleared"
        );
    }
}

impl Drop for PipelineSandbox {
    fn drop(&mut self) {
        self.orchestrator.registry().terminate_all();
    }
}

/// Polls `check` until it holds or the poll limit passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + POLL_LIMIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    check()
}

/// A loopback port that refuses connections.
pub fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    port
}
