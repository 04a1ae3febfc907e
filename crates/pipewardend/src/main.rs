use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match pipewardend::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Telemetry may not be installed when launch fails early.
            if writeln!(io::stderr(), "pipewardend: {error}").is_err() {
                return ExitCode::from(2);
            }
            ExitCode::FAILURE
        }
    }
}
