//! Named supervision of external child processes.
//!
//! The registry owns the live set: a map from process name to the pid and
//! spawn generation of its running instance. It knows nothing about the
//! pipeline; callers decide what to start and when. Each child is reaped by a
//! watcher task that appends an exit line to the child's error log and
//! publishes an [`ExitEvent`] to every subscriber.

mod errors;
mod logs;
mod spec;
mod stray;

use std::collections::{BTreeMap, HashMap};
use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use serde::Serialize;
use tokio::process::{Child, Command};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub use errors::RegistryError;
pub use spec::LaunchSpec;

pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

const EXIT_CHANNEL_CAPACITY: usize = 64;

/// Result of asking the registry to start a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StartOutcome {
    /// A new instance was spawned.
    Started {
        /// OS pid of the new instance.
        pid: u32,
    },
    /// An instance was already live; nothing was spawned.
    AlreadyRunning {
        /// OS pid of the existing instance.
        pid: u32,
    },
}

impl StartOutcome {
    /// Pid of the live instance, whichever branch was taken.
    #[must_use]
    pub const fn pid(self) -> u32 {
        match self {
            Self::Started { pid } | Self::AlreadyRunning { pid } => pid,
        }
    }
}

/// Result of asking the registry to stop a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StopOutcome {
    /// SIGTERM was delivered and the name was removed from the live set.
    Stopped,
    /// No instance was tracked under the name.
    NotRunning,
}

/// Published whenever a supervised child exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitEvent {
    /// Registry name of the process.
    pub name: String,
    /// OS pid the process ran under.
    pub pid: u32,
    /// Exit code, absent when the process was killed by a signal.
    pub code: Option<i32>,
    /// Terminating signal number, if any.
    pub signal: Option<i32>,
    /// True when the instance had already been removed by [`ProcessRegistry::stop`]
    /// or replaced by a newer spawn.
    pub expected: bool,
}

#[derive(Debug, Clone, Copy)]
struct LiveProcess {
    pid: u32,
    generation: u64,
}

#[derive(Debug)]
struct RegistryInner {
    log_dir: Utf8PathBuf,
    live: Mutex<HashMap<String, LiveProcess>>,
    generation: AtomicU64,
    exits: broadcast::Sender<ExitEvent>,
}

impl RegistryInner {
    fn live(&self) -> MutexGuard<'_, HashMap<String, LiveProcess>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared handle onto the live set. Clones observe the same processes.
#[derive(Debug, Clone)]
pub struct ProcessRegistry {
    inner: Arc<RegistryInner>,
}

impl ProcessRegistry {
    /// Builds an empty registry writing child logs beneath `log_dir`.
    #[must_use]
    pub fn new(log_dir: impl Into<Utf8PathBuf>) -> Self {
        let (exits, _) = broadcast::channel(EXIT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(RegistryInner {
                log_dir: log_dir.into(),
                live: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                exits,
            }),
        }
    }

    /// Directory holding the per-process log files.
    #[must_use]
    pub fn log_dir(&self) -> &Utf8Path {
        &self.inner.log_dir
    }

    /// Spawns `spec` unless an instance with the same name is already live.
    ///
    /// Must be called from within a Tokio runtime: the exit watcher is a
    /// spawned task.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the log sinks cannot be opened or the
    /// OS refuses to spawn the command. The live set is left untouched.
    pub fn start(&self, spec: &LaunchSpec) -> Result<StartOutcome, RegistryError> {
        let mut live = self.inner.live();
        if let Some(existing) = live.get(spec.name()) {
            debug!(
                target: REGISTRY_TARGET,
                name = spec.name(),
                pid = existing.pid,
                "start requested for live process"
            );
            return Ok(StartOutcome::AlreadyRunning { pid: existing.pid });
        }

        let sinks = logs::LogSinks::open(&self.inner.log_dir, spec.name())?;
        let mut command = Command::new(spec.command().as_std_path());
        command
            .args(spec.args())
            .envs(spec.envs())
            .stdin(Stdio::null())
            .stdout(Stdio::from(sinks.stdout))
            .stderr(Stdio::from(sinks.stderr));
        if let Some(dir) = spec.workdir() {
            command.current_dir(dir.as_std_path());
        }
        let mut child = command.spawn().map_err(|source| RegistryError::Spawn {
            name: spec.name().to_owned(),
            command: spec.command().to_string(),
            source,
        })?;
        let Some(pid) = child.id() else {
            if let Err(error) = child.start_kill() {
                warn!(
                    target: REGISTRY_TARGET,
                    name = spec.name(),
                    %error,
                    "failed to kill child without pid"
                );
            }
            return Err(RegistryError::MissingPid {
                name: spec.name().to_owned(),
            });
        };

        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        live.insert(spec.name().to_owned(), LiveProcess { pid, generation });
        drop(live);

        info!(
            target: REGISTRY_TARGET,
            name = spec.name(),
            pid,
            command = %spec.command(),
            args = ?spec.args(),
            "process started"
        );
        tokio::spawn(watch(
            Arc::clone(&self.inner),
            spec.name().to_owned(),
            pid,
            generation,
            child,
        ));
        Ok(StartOutcome::Started { pid })
    }

    /// Sends SIGTERM to the named process and forgets it without waiting.
    pub fn stop(&self, name: &str) -> StopOutcome {
        let Some(entry) = self.inner.live().remove(name) else {
            return StopOutcome::NotRunning;
        };
        terminate(name, entry.pid);
        StopOutcome::Stopped
    }

    /// Sends SIGTERM to every tracked process and empties the live set.
    ///
    /// Returns the names that were signalled.
    pub fn terminate_all(&self) -> Vec<String> {
        let drained: Vec<(String, LiveProcess)> = self.inner.live().drain().collect();
        drained
            .into_iter()
            .map(|(name, entry)| {
                terminate(&name, entry.pid);
                name
            })
            .collect()
    }

    /// Pid of the live instance of `name`.
    #[must_use]
    pub fn pid(&self, name: &str) -> Option<u32> {
        self.inner.live().get(name).map(|entry| entry.pid)
    }

    /// Whether `name` is in the live set.
    #[must_use]
    pub fn is_running(&self, name: &str) -> bool {
        self.inner.live().contains_key(name)
    }

    /// Name to pid view of the live set.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        self.inner
            .live()
            .iter()
            .map(|(name, entry)| (name.clone(), entry.pid))
            .collect()
    }

    /// Receives an [`ExitEvent`] for every child exit after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ExitEvent> {
        self.inner.exits.subscribe()
    }

    /// Best-effort sweep of untracked processes whose command line matches
    /// `pattern`.
    pub async fn kill_matching(&self, pattern: &str) {
        stray::kill_matching(pattern).await;
    }
}

fn terminate(name: &str, pid: u32) {
    let Ok(raw) = i32::try_from(pid) else {
        warn!(target: REGISTRY_TARGET, name, pid, "pid out of range; not signalled");
        return;
    };
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => info!(target: REGISTRY_TARGET, name, pid, "sent SIGTERM"),
        Err(Errno::ESRCH) => debug!(target: REGISTRY_TARGET, name, pid, "process already gone"),
        Err(errno) => warn!(
            target: REGISTRY_TARGET,
            name,
            pid,
            error = %errno,
            "failed to deliver SIGTERM"
        ),
    }
}

async fn watch(
    inner: Arc<RegistryInner>,
    name: String,
    pid: u32,
    generation: u64,
    mut child: Child,
) {
    let (code, signal) = match child.wait().await {
        Ok(status) => (status.code(), status.signal()),
        Err(error) => {
            warn!(
                target: REGISTRY_TARGET,
                name = %name,
                pid,
                %error,
                "failed to observe process exit"
            );
            (None, None)
        }
    };

    let expected = {
        let mut live = inner.live();
        match live.get(&name) {
            Some(entry) if entry.generation == generation => {
                live.remove(&name);
                false
            }
            _ => true,
        }
    };

    if let Err(error) = logs::append_exit_line(&inner.log_dir, &name, code, signal) {
        warn!(
            target: REGISTRY_TARGET,
            name = %name,
            %error,
            "failed to record exit line"
        );
    }
    info!(
        target: REGISTRY_TARGET,
        name = %name,
        pid,
        code = ?code,
        signal = ?signal,
        expected,
        "process exited"
    );

    let event = ExitEvent {
        name,
        pid,
        code,
        signal,
        expected,
    };
    if inner.exits.send(event).is_err() {
        debug!(target: REGISTRY_TARGET, "no exit subscribers");
    }
}
