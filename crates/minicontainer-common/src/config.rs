//! Runtime configuration record.
//!
//! Every component receives this record at call time instead of reading
//! fixed paths, so two launches can be pointed at distinct rootfs and
//! cgroup locations.

use std::path::PathBuf;

use crate::constants;
use crate::types::{LaunchId, ResourceLimits};

/// Where the container cgroup lives in the unified hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupLocation {
    /// Mount point of the cgroup v2 hierarchy.
    pub root: PathBuf,
    /// Name of the group directory below `root`.
    pub name: String,
}

impl CgroupLocation {
    /// Returns the full path of the group directory.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.name)
    }
}

impl Default for CgroupLocation {
    fn default() -> Self {
        Self {
            root: PathBuf::from(constants::CGROUP_V2_PATH),
            name: constants::DEFAULT_CGROUP_NAME.to_string(),
        }
    }
}

/// Root configuration for a provisioning or launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Directory the image is extracted into.
    pub rootfs_dir: PathBuf,
    /// URL of the compressed rootfs archive.
    pub image_url: String,
    /// Hostname set inside the container.
    pub hostname: String,
    /// Cgroup the container is enrolled into.
    pub cgroup: CgroupLocation,
    /// Whether the cgroup is private to this launch and removed afterwards.
    pub per_launch_cgroup: bool,
    /// Limits written into the cgroup.
    pub limits: ResourceLimits,
    /// Program run when the request carries no command.
    pub default_command: String,
    /// Executable re-invoked for child mode.
    pub self_exe: PathBuf,
}

impl RuntimeConfig {
    /// Gives this launch its own cgroup, named after the launch ID.
    #[must_use]
    pub fn with_launch_cgroup(mut self, id: &LaunchId) -> Self {
        self.cgroup.name = format!("{}-{id}", constants::DEFAULT_CGROUP_NAME);
        self.per_launch_cgroup = true;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            rootfs_dir: PathBuf::from(constants::DEFAULT_ROOTFS_DIR),
            image_url: constants::DEFAULT_IMAGE_URL.to_string(),
            hostname: constants::DEFAULT_HOSTNAME.to_string(),
            cgroup: CgroupLocation::default(),
            per_launch_cgroup: false,
            limits: ResourceLimits::default(),
            default_command: constants::DEFAULT_COMMAND.to_string(),
            self_exe: PathBuf::from(constants::SELF_EXE),
        }
    }
}
