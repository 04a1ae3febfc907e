use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};

/// Everything needed to spawn one supervised process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    name: String,
    command: Utf8PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    workdir: Option<Utf8PathBuf>,
}

impl LaunchSpec {
    /// Creates a spec for `command`, tracked under `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, command: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            workdir: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds an environment override merged over the inherited environment.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the working directory of the child.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    /// Registry key of the process.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executable that is spawned.
    #[must_use]
    pub fn command(&self) -> &Utf8Path {
        &self.command
    }

    /// Ordered arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Environment overrides.
    #[must_use]
    pub fn envs(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Working directory, when one was set.
    #[must_use]
    pub fn workdir(&self) -> Option<&Utf8Path> {
        self.workdir.as_deref()
    }
}
