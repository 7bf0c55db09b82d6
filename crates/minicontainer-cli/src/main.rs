//! # minicontainer
//!
//! Provisions a root filesystem image and runs a command inside it with
//! its own namespaces and cgroup limits.

mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;
use minicontainer_common::error::{GENERIC_FAILURE_CODE, MinicontainerError};
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

fn main() -> ExitCode {
    // Stdout belongs to the container; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match commands::execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code(&err);
            if matches!(
                err.downcast_ref::<MinicontainerError>(),
                Some(MinicontainerError::ChildExited { .. })
            ) {
                tracing::debug!(code, "{err:#}");
            } else {
                output::print_error(&err);
            }
            ExitCode::from(code)
        }
    }
}

/// Exit status for a failed command: the container's own code when it
/// exited non-zero, `128 + signo` for a signal death, otherwise 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    let code = err
        .downcast_ref::<MinicontainerError>()
        .map_or(GENERIC_FAILURE_CODE, MinicontainerError::exit_code);
    u8::try_from(code)
        .ok()
        .filter(|c| *c != 0)
        .unwrap_or(1)
}
