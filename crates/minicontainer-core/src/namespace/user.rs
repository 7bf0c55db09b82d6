//! User namespace isolation.
//!
//! Maps container UIDs/GIDs to unprivileged host IDs, enabling rootless
//! containers.

use std::path::Path;

use minicontainer_common::error::{MinicontainerError, Result};

/// One line of a `uid_map` or `gid_map` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMap {
    /// First ID inside the namespace.
    pub container_id: u32,
    /// First ID on the host the range maps to.
    pub host_id: u32,
    /// Length of the range.
    pub size: u32,
}

impl IdMap {
    /// Creates a new ID mapping.
    #[must_use]
    pub const fn new(container_id: u32, host_id: u32, size: u32) -> Self {
        Self {
            container_id,
            host_id,
            size,
        }
    }

    /// Maps container root (0) onto a single host ID.
    #[must_use]
    pub const fn root_to(host_id: u32) -> Self {
        Self::new(0, host_id, 1)
    }

    /// Formats the mapping for `/proc/<pid>/uid_map` or `gid_map`.
    #[must_use]
    pub fn to_proc_line(&self) -> String {
        format!("{} {} {}", self.container_id, self.host_id, self.size)
    }
}

/// Installs the UID and GID maps of a child's user namespace.
///
/// `setgroups` is denied first: the kernel refuses an unprivileged
/// single-range `gid_map` while `setgroups(2)` is still allowed.
///
/// # Errors
///
/// Returns [`MinicontainerError::NamespaceSetup`] if writing
/// `/proc/<pid>/setgroups`, `/proc/<pid>/uid_map`, or `/proc/<pid>/gid_map`
/// fails.
pub fn write_id_maps(pid: u32, uid_map: &IdMap, gid_map: &IdMap) -> Result<()> {
    write_id_maps_in(Path::new("/proc"), pid, uid_map, gid_map)
}

/// Same as [`write_id_maps`], against an arbitrary procfs root.
///
/// # Errors
///
/// Returns [`MinicontainerError::NamespaceSetup`] if any control file
/// cannot be written.
pub fn write_id_maps_in(proc_root: &Path, pid: u32, uid_map: &IdMap, gid_map: &IdMap) -> Result<()> {
    let proc_dir = proc_root.join(pid.to_string());

    let setgroups = proc_dir.join("setgroups");
    if setgroups.exists() {
        write_control(&setgroups, "deny")?;
    }
    write_control(&proc_dir.join("uid_map"), &uid_map.to_proc_line())?;
    write_control(&proc_dir.join("gid_map"), &gid_map.to_proc_line())?;

    tracing::debug!(
        pid,
        uid_map = %uid_map.to_proc_line(),
        gid_map = %gid_map.to_proc_line(),
        "wrote UID/GID map"
    );
    Ok(())
}

fn write_control(path: &Path, value: &str) -> Result<()> {
    std::fs::write(path, value).map_err(|e| MinicontainerError::NamespaceSetup {
        message: format!("writing {value:?} to {}: {e}", path.display()),
    })
}
