//! Cgroups v2 resource management.
//!
//! Creates the container's group in the unified hierarchy, writes its
//! memory and CPU limits, and joins a process to it.

pub mod cpu;
pub mod memory;

use std::path::{Path, PathBuf};

use minicontainer_common::config::CgroupLocation;
use minicontainer_common::error::{MinicontainerError, Result};
use minicontainer_common::types::ResourceLimits;

/// Handle to the container's cgroup directory.
#[derive(Debug)]
pub struct CgroupManager {
    /// Path to the group directory.
    path: PathBuf,
}

impl CgroupManager {
    /// Creates the cgroup directory (an existing one is reused).
    ///
    /// # Errors
    ///
    /// Returns an error if the cgroup directory cannot be created.
    pub fn create(location: &CgroupLocation) -> Result<Self> {
        let path = location.path();
        std::fs::create_dir_all(&path).map_err(|e| MinicontainerError::Cgroup {
            path: path.clone(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), "cgroup created");
        Ok(Self { path })
    }

    /// Writes the memory ceiling and the CPU quota/period pair.
    ///
    /// # Errors
    ///
    /// Returns an error if writing either control file fails.
    pub fn apply_limits(&self, limits: &ResourceLimits) -> Result<()> {
        memory::set_memory_max(&self.path, limits.memory_bytes)?;
        cpu::set_cpu_max(&self.path, limits.cpu_quota_us, limits.cpu_period_us)?;
        Ok(())
    }

    /// Adds a process to this cgroup by writing its PID.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `cgroup.procs` fails.
    pub fn add_process(&self, pid: u32) -> Result<()> {
        let procs_path = self.path.join("cgroup.procs");
        std::fs::write(&procs_path, pid.to_string()).map_err(|e| MinicontainerError::Cgroup {
            path: procs_path,
            source: e,
        })?;
        tracing::debug!(pid, "added process to cgroup");
        Ok(())
    }

    /// Removes the cgroup directory.
    ///
    /// Cgroupfs directories are removed with `rmdir(2)`; the kernel refuses
    /// while any process is still a member.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be removed.
    pub fn destroy(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_dir(&self.path).map_err(|e| MinicontainerError::Cgroup {
                path: self.path.clone(),
                source: e,
            })?;
        }
        tracing::info!(path = %self.path.display(), "cgroup destroyed");
        Ok(())
    }

    /// Returns the group directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Creates the group, applies `limits`, and joins `pid` to it.
///
/// Limits are written before the process joins, so it never runs inside
/// the group unconstrained.
///
/// # Errors
///
/// Returns an error if any of the directory, limit, or membership writes
/// fails. There is no fallback to an unlimited run.
pub fn enroll(pid: u32, limits: &ResourceLimits, location: &CgroupLocation) -> Result<CgroupManager> {
    let manager = CgroupManager::create(location)?;
    manager.apply_limits(limits)?;
    manager.add_process(pid)?;
    tracing::info!(
        pid,
        path = %manager.path().display(),
        memory_bytes = limits.memory_bytes,
        cpu_quota_us = limits.cpu_quota_us,
        cpu_period_us = limits.cpu_period_us,
        "process enrolled in cgroup"
    );
    Ok(manager)
}
