//! Running the container command and translating how it ended.

use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus};

use minicontainer_common::error::{MinicontainerError, Result};

/// Runs `program` with `args`, inheriting stdin, stdout and stderr, and
/// waits for it to exit.
///
/// # Errors
///
/// - [`MinicontainerError::Exec`] if the program cannot be started.
/// - [`MinicontainerError::ChildExited`] if it exits non-zero.
/// - [`MinicontainerError::ChildSignaled`] if a signal terminates it.
pub fn run_command(program: &str, args: &[String]) -> Result<()> {
    tracing::info!(program, args = ?args, "running container command");

    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| MinicontainerError::Exec {
            program: program.to_string(),
            source: e,
        })?;

    tracing::debug!(program, %status, "container command finished");
    status_to_result(status)
}

/// Maps a finished process's status onto the error taxonomy.
///
/// # Errors
///
/// Returns [`MinicontainerError::ChildExited`] for a non-zero exit and
/// [`MinicontainerError::ChildSignaled`] for a signal death.
pub fn status_to_result(status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(MinicontainerError::ChildExited { code });
    }
    let signo = status.signal().unwrap_or_default();
    Err(MinicontainerError::ChildSignaled {
        signal: signal_name(signo),
        signo,
    })
}

/// Returns the conventional name of a signal number, e.g. `SIGKILL`.
#[must_use]
pub fn signal_name(signo: i32) -> String {
    nix::sys::signal::Signal::try_from(signo)
        .map_or_else(|_| format!("signal {signo}"), |signal| signal.as_str().to_string())
}
