//! Mount utilities for container filesystem setup.
//!
//! Handles the private mount tree and the `/proc` mount inside the
//! container's namespace.

use std::path::Path;

use minicontainer_common::error::{MinicontainerError, Result};

/// Marks every mount below `/` private, so nothing mounted afterwards
/// propagates back into the parent namespace.
///
/// Must run inside a fresh mount namespace and before any `chroot`: after
/// it, `/` names a plain directory rather than a mount point.
///
/// # Errors
///
/// Returns [`MinicontainerError::Mount`] if the remount fails.
#[cfg(target_os = "linux")]
pub fn make_mounts_private() -> Result<()> {
    use nix::mount::{MsFlags, mount};

    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .map_err(|e| MinicontainerError::Mount {
        target: "/".into(),
        message: format!("remount private failed: {e}"),
    })?;
    tracing::debug!("mount tree made private");
    Ok(())
}

/// Mounts a fresh `proc` filesystem at `target`, creating the directory
/// if the rootfs lacks it.
///
/// The mount reflects the caller's PID namespace, so it must be issued
/// from inside the container.
///
/// # Errors
///
/// Returns [`MinicontainerError::Filesystem`] if the mount point cannot be
/// created and [`MinicontainerError::Mount`] if `mount(2)` fails.
#[cfg(target_os = "linux")]
pub fn mount_proc(target: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    std::fs::create_dir_all(target).map_err(|e| MinicontainerError::Filesystem {
        path: target.to_path_buf(),
        source: e,
    })?;
    mount(
        Some("proc"),
        target,
        Some("proc"),
        MsFlags::MS_NOSUID | MsFlags::MS_NODEV | MsFlags::MS_NOEXEC,
        None::<&str>,
    )
    .map_err(|e| MinicontainerError::Mount {
        target: target.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::info!(target = %target.display(), "proc mounted");
    Ok(())
}

/// Unmounts the filesystem at `target`.
///
/// # Errors
///
/// Returns [`MinicontainerError::Unmount`] if `umount(2)` fails.
#[cfg(target_os = "linux")]
pub fn unmount(target: &Path) -> Result<()> {
    nix::mount::umount(target).map_err(|e| MinicontainerError::Unmount {
        target: target.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::debug!(target = %target.display(), "unmounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: mount namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn make_mounts_private() -> Result<()> {
    Err(linux_required())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: mount namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_proc(_target: &Path) -> Result<()> {
    Err(linux_required())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: mount namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn unmount(_target: &Path) -> Result<()> {
    Err(linux_required())
}

#[cfg(not(target_os = "linux"))]
fn linux_required() -> MinicontainerError {
    MinicontainerError::Config {
        message: "Linux required for native container operations".into(),
    }
}
