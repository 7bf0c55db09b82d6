//! Memory resource control via cgroups v2.

use std::path::Path;

use minicontainer_common::error::{MinicontainerError, Result};

/// Sets the hard memory limit for a cgroup.
///
/// Once the group's usage reaches `memory.max` and cannot be reclaimed,
/// the kernel OOM-kills a process inside the group.
///
/// # Errors
///
/// Returns an error if writing to `memory.max` fails.
pub fn set_memory_max(cgroup_path: &Path, bytes: u64) -> Result<()> {
    let file = cgroup_path.join("memory.max");
    std::fs::write(&file, bytes.to_string()).map_err(|e| MinicontainerError::Cgroup {
        path: file,
        source: e,
    })?;
    tracing::debug!(bytes, "memory max limit set");
    Ok(())
}
