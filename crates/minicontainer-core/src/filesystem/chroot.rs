//! Root filesystem switching via `chroot(2)`.

use std::path::Path;

use minicontainer_common::error::{MinicontainerError, Result};

/// Confines the calling process below `new_root`.
///
/// The working directory is moved to the new `/` after the `chroot`, never
/// before: a working directory left outside the new root would still
/// resolve relative paths against the host tree.
///
/// # Errors
///
/// Returns [`MinicontainerError::Filesystem`] if `chroot(2)` or `chdir(2)`
/// fails.
#[cfg(target_os = "linux")]
pub fn enter_root(new_root: &Path) -> Result<()> {
    nix::unistd::chroot(new_root).map_err(|e| MinicontainerError::Filesystem {
        path: new_root.to_path_buf(),
        source: e.into(),
    })?;
    nix::unistd::chdir("/").map_err(|e| MinicontainerError::Filesystem {
        path: "/".into(),
        source: e.into(),
    })?;
    tracing::info!(new_root = %new_root.display(), "entered container root");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: container roots require Linux.
#[cfg(not(target_os = "linux"))]
pub fn enter_root(_new_root: &Path) -> Result<()> {
    Err(MinicontainerError::Config {
        message: "Linux required for native container operations".into(),
    })
}
