//! Container init: the child side of a launch.
//!
//! Runs as PID 1 of the fresh namespaces after the launcher has installed
//! the ID maps and enrolled the process in its cgroup.

use std::path::Path;

use minicontainer_common::config::RuntimeConfig;
use minicontainer_common::error::Result;
use minicontainer_common::types::LaunchRequest;
use minicontainer_core::filesystem::{chroot, mount};
use minicontainer_core::namespace::uts;

use crate::process;

/// Mount point of the container's own procfs, relative to the new root.
const PROC_MOUNT: &str = "/proc";

/// Prepares the container environment and runs the requested command.
///
/// Any failing step aborts the launch; earlier steps are not rolled back.
///
/// # Errors
///
/// Returns the error of the first step that fails, or the command's own
/// exit status as [`ChildExited`](minicontainer_common::error::MinicontainerError::ChildExited)
/// or [`ChildSignaled`](minicontainer_common::error::MinicontainerError::ChildSignaled).
pub fn initialize(request: &LaunchRequest, config: &RuntimeConfig) -> Result<()> {
    tracing::info!(
        rootfs = %request.rootfs.display(),
        hostname = %config.hostname,
        pid = std::process::id(),
        "container init starting"
    );

    uts::set_hostname(&config.hostname)?;

    // `/` is only a mount point before the chroot; the rootfs directory
    // itself is not one, and remounting it would fail with EINVAL.
    mount::make_mounts_private()?;
    chroot::enter_root(&request.rootfs)?;

    let proc_dir = Path::new(PROC_MOUNT);
    mount::mount_proc(proc_dir)?;

    tracing::debug!(cgroup = %config.cgroup.path().display(), "cgroup membership set by launcher");

    let (program, args) = resolve_command(request, config);
    process::run_command(program, args)?;

    mount::unmount(proc_dir)?;
    Ok(())
}

/// Picks the program to run: the requested command, or the default shell.
#[must_use]
pub fn resolve_command<'a>(
    request: &'a LaunchRequest,
    config: &'a RuntimeConfig,
) -> (&'a str, &'a [String]) {
    match request.command.as_deref() {
        Some(program) => (program, request.args.as_slice()),
        None => {
            tracing::info!(program = %config.default_command, "no command given, using default");
            (config.default_command.as_str(), &[][..])
        }
    }
}
