//! Namespace launcher: the parent side of a launch.
//!
//! The child is created with `clone(2)` directly into fresh namespaces and
//! parked on a sync pipe. While it waits, the parent installs its UID/GID
//! maps and enrolls it in the cgroup; then one byte releases it and it
//! re-executes this binary in child mode, where [`crate::init`] takes over.

use std::ffi::{CString, OsString};
use std::os::unix::ffi::OsStringExt;

use minicontainer_common::config::RuntimeConfig;
use minicontainer_common::constants;
use minicontainer_common::error::{MinicontainerError, Result};
use minicontainer_common::types::LaunchRequest;

/// Stack handed to the cloned child; it only reads the gate and execs.
#[cfg(target_os = "linux")]
const CHILD_STACK_SIZE: usize = 256 * 1024;

/// Child exit code when the gate closes without a release byte.
#[cfg(target_os = "linux")]
const GATE_CLOSED: isize = 1;

/// Child exit code when re-executing the binary fails.
#[cfg(target_os = "linux")]
const EXEC_FAILED: isize = 127;

/// Builds the argv the child re-executes with.
///
/// Layout: `minicontainer child --hostname <name> <rootfs> -- <command> <args>...`.
/// The command and its arguments are passed through unchanged.
#[must_use]
pub fn reexec_argv(request: &LaunchRequest, config: &RuntimeConfig) -> Vec<OsString> {
    let mut argv: Vec<OsString> = vec![
        constants::BIN_NAME.into(),
        constants::CHILD_VERB.into(),
        "--hostname".into(),
        config.hostname.clone().into(),
        request.rootfs.clone().into_os_string(),
        "--".into(),
    ];
    argv.extend(request.argv().into_iter().map(OsString::from));
    argv
}

/// Runs `request` in a new set of namespaces and waits for it to finish.
///
/// # Errors
///
/// - [`MinicontainerError::Config`] if the rootfs is not a directory.
/// - [`MinicontainerError::NamespaceSetup`] if the child cannot be created,
///   its ID maps are rejected, or it cannot be waited for.
/// - [`MinicontainerError::Cgroup`] if enrollment fails.
/// - [`MinicontainerError::ChildExited`] or
///   [`MinicontainerError::ChildSignaled`] if the container did not exit 0.
#[cfg(target_os = "linux")]
pub fn launch(request: LaunchRequest, config: &RuntimeConfig) -> Result<()> {
    use minicontainer_core::namespace::NamespaceSpec;

    if !request.rootfs.is_dir() {
        return Err(MinicontainerError::Config {
            message: format!(
                "rootfs {} is not a directory; run `{} init` first",
                request.rootfs.display(),
                constants::BIN_NAME
            ),
        });
    }

    let argv = reexec_argv(&request, config)
        .into_iter()
        .map(to_cstring)
        .collect::<Result<Vec<_>>>()?;
    let exe = to_cstring(config.self_exe.clone().into_os_string())?;
    let namespaces = NamespaceSpec::for_invoking_user();

    tracing::info!(
        rootfs = %request.rootfs.display(),
        command = ?request.argv(),
        hostname = %config.hostname,
        cgroup = %config.cgroup.path().display(),
        "launching container"
    );

    let (gate_read, gate_write) = nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
        .map_err(|e| setup_error(format!("sync pipe: {e}")))?;
    let child = spawn_child(exe, argv, &namespaces, &gate_read, &gate_write)?;
    drop(gate_read);

    let pid = child.as_raw().unsigned_abs();
    tracing::debug!(pid, "child cloned, waiting at gate");

    let prepared = prepare_child(pid, &namespaces, config).and_then(|manager| {
        release_gate(&gate_write)?;
        Ok(manager)
    });
    drop(gate_write);

    let status = wait_for(child);
    let manager = match prepared {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!(pid, error = %e, "child setup failed, gate closed");
            if let Err(wait_err) = status {
                tracing::warn!(pid, error = %wait_err, "failed to reap aborted child");
            }
            if config.per_launch_cgroup {
                remove_launch_cgroup(&config.cgroup.path());
            }
            return Err(e);
        }
    };

    let result = status.and_then(wait_status_to_result);
    tracing::info!(pid, ok = result.is_ok(), "container exited");

    if config.per_launch_cgroup {
        if let Err(e) = manager.destroy() {
            tracing::warn!(error = %e, "failed to remove launch cgroup");
        }
    }
    result
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn launch(_request: LaunchRequest, _config: &RuntimeConfig) -> Result<()> {
    Err(MinicontainerError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Clones the child into the requested namespaces, parked on the gate.
#[cfg(target_os = "linux")]
fn spawn_child(
    exe: CString,
    argv: Vec<CString>,
    namespaces: &minicontainer_core::namespace::NamespaceSpec,
    gate_read: &std::os::fd::OwnedFd,
    gate_write: &std::os::fd::OwnedFd,
) -> Result<nix::unistd::Pid> {
    use std::os::fd::AsRawFd;

    use nix::sched::clone;
    use nix::sys::signal::Signal;

    let read_fd = gate_read.as_raw_fd();
    let write_fd = gate_write.as_raw_fd();

    // Between clone and exec the child only closes the write end, reads the
    // gate and execs. Nothing is logged there.
    let child_main = Box::new(move || -> isize {
        let mut byte = [0u8; 1];
        // SAFETY: both descriptors were valid in the parent at clone time
        // and the child owns its own copy of the fd table.
        let released = unsafe {
            let _ = libc::close(write_fd);
            libc::read(read_fd, byte.as_mut_ptr().cast(), 1) == 1
        };
        if !released {
            return GATE_CLOSED;
        }
        let _ = nix::unistd::execv(&exe, &argv);
        EXEC_FAILED
    });

    let mut stack = vec![0u8; CHILD_STACK_SIZE];
    // SAFETY: without CLONE_VM the child runs on a private copy of the
    // address space, so the boxed closure and stack stay valid for it.
    let child = unsafe {
        clone(
            child_main,
            &mut stack,
            namespaces.clone_flags(),
            Some(Signal::SIGCHLD as i32),
        )
    }
    .map_err(|e| setup_error(format!("clone failed: {e}")))?;
    Ok(child)
}

/// Parent-side setup performed while the child waits at the gate.
#[cfg(target_os = "linux")]
fn prepare_child(
    pid: u32,
    namespaces: &minicontainer_core::namespace::NamespaceSpec,
    config: &RuntimeConfig,
) -> Result<minicontainer_core::cgroup::CgroupManager> {
    if namespaces.user {
        minicontainer_core::namespace::user::write_id_maps(
            pid,
            &namespaces.uid_map,
            &namespaces.gid_map,
        )?;
    }
    minicontainer_core::cgroup::enroll(pid, &config.limits, &config.cgroup)
}

#[cfg(target_os = "linux")]
fn release_gate(gate_write: &std::os::fd::OwnedFd) -> Result<()> {
    match nix::unistd::write(gate_write, &[1u8]) {
        Ok(1) => Ok(()),
        Ok(n) => Err(setup_error(format!("sync pipe: wrote {n} bytes"))),
        Err(e) => Err(setup_error(format!("sync pipe: {e}"))),
    }
}

/// Blocks until `child` terminates, retrying on `EINTR`.
#[cfg(target_os = "linux")]
fn wait_for(child: nix::unistd::Pid) -> Result<nix::sys::wait::WaitStatus> {
    use nix::errno::Errno;
    use nix::sys::wait::waitpid;

    loop {
        match waitpid(child, None) {
            Err(Errno::EINTR) => {}
            other => {
                return other.map_err(|e| setup_error(format!("waitpid({child}) failed: {e}")));
            }
        }
    }
}

/// Maps a reaped child's wait status onto the error taxonomy.
///
/// # Errors
///
/// Returns [`MinicontainerError::ChildExited`] for a non-zero exit,
/// [`MinicontainerError::ChildSignaled`] for a signal death, and
/// [`MinicontainerError::NamespaceSetup`] for any other status.
#[cfg(target_os = "linux")]
pub fn wait_status_to_result(status: nix::sys::wait::WaitStatus) -> Result<()> {
    use nix::sys::wait::WaitStatus;

    match status {
        WaitStatus::Exited(_, 0) => Ok(()),
        WaitStatus::Exited(_, code) => Err(MinicontainerError::ChildExited { code }),
        WaitStatus::Signaled(_, signal, _) => Err(MinicontainerError::ChildSignaled {
            signal: signal.as_str().to_string(),
            signo: signal as i32,
        }),
        other => Err(setup_error(format!("unexpected wait status {other:?}"))),
    }
}

#[cfg(target_os = "linux")]
fn remove_launch_cgroup(path: &std::path::Path) {
    match std::fs::remove_dir(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed launch cgroup"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove launch cgroup"),
    }
}

fn to_cstring(value: OsString) -> Result<CString> {
    CString::new(value.into_vec()).map_err(|e| MinicontainerError::Config {
        message: format!("argument contains a NUL byte: {e}"),
    })
}

#[cfg(target_os = "linux")]
fn setup_error(message: String) -> MinicontainerError {
    MinicontainerError::NamespaceSetup { message }
}
