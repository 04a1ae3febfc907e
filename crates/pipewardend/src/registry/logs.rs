//! Per-process log sinks under the configured log directory.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use nix::sys::signal::Signal;

use super::errors::RegistryError;

pub(super) struct LogSinks {
    pub(super) stdout: File,
    pub(super) stderr: File,
}

impl LogSinks {
    /// Opens `<name>.out.log` and `<name>.err.log` for appending.
    pub(super) fn open(log_dir: &Utf8Path, name: &str) -> Result<Self, RegistryError> {
        fs::create_dir_all(log_dir).map_err(|source| RegistryError::LogDirectory {
            path: log_dir.to_path_buf(),
            source,
        })?;
        let stdout = open_append(&stdout_path(log_dir, name)).map_err(|source| {
            RegistryError::LogSink {
                name: name.to_owned(),
                path: stdout_path(log_dir, name),
                source,
            }
        })?;
        let stderr = open_append(&stderr_path(log_dir, name)).map_err(|source| {
            RegistryError::LogSink {
                name: name.to_owned(),
                path: stderr_path(log_dir, name),
                source,
            }
        })?;
        Ok(Self { stdout, stderr })
    }
}

pub(crate) fn stdout_path(log_dir: &Utf8Path, name: &str) -> Utf8PathBuf {
    log_dir.join(format!("{name}.out.log"))
}

pub(crate) fn stderr_path(log_dir: &Utf8Path, name: &str) -> Utf8PathBuf {
    log_dir.join(format!("{name}.err.log"))
}

fn open_append(path: &Utf8Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Formats the line recorded in the error log when a process exits.
pub(crate) fn exit_line(name: &str, code: Option<i32>, signal: Option<i32>) -> String {
    let code = code.map_or_else(|| String::from("null"), |code| code.to_string());
    let signal = signal.map_or_else(
        || String::from("null"),
        |raw| {
            Signal::try_from(raw)
                .map_or_else(|_| raw.to_string(), |signal| signal.as_str().to_owned())
        },
    );
    format!("[{name}] exited code={code} signal={signal}\n")
}

pub(super) fn append_exit_line(
    log_dir: &Utf8Path,
    name: &str,
    code: Option<i32>,
    signal: Option<i32>,
) -> io::Result<()> {
    let mut file = open_append(&stderr_path(log_dir, name))?;
    file.write_all(exit_line(name, code, signal).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some(0), None, "[engine] exited code=0 signal=null\n")]
    #[case(None, Some(15), "[engine] exited code=null signal=SIGTERM\n")]
    #[case(None, Some(9), "[engine] exited code=null signal=SIGKILL\n")]
    fn formats_exit_lines(
        #[case] code: Option<i32>,
        #[case] signal: Option<i32>,
        #[case] expected: &str,
    ) {
        assert_eq!(exit_line("engine", code, signal), expected);
    }

    #[test]
    fn sinks_are_created_on_demand() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8Path::from_path(dir.path()).expect("utf8 temp dir");
        let log_dir = root.join("nested/logs");
        LogSinks::open(&log_dir, "relay").expect("open sinks");
        assert!(stdout_path(&log_dir, "relay").exists());
        assert!(stderr_path(&log_dir, "relay").exists());
    }

    #[test]
    fn exit_lines_are_appended() {
        let dir = tempfile::tempdir().expect("temp dir");
        let log_dir = Utf8Path::from_path(dir.path()).expect("utf8 temp dir");
        append_exit_line(log_dir, "relay", Some(1), None).expect("first line");
        append_exit_line(log_dir, "relay", None, Some(15)).expect("second line");
        let contents = fs::read_to_string(stderr_path(log_dir, "relay")).expect("read log");
        assert_eq!(
            contents,
            "[relay] exited code=1 signal=null\n[relay] exited code=null signal=SIGTERM\n"
        );
    }
}
