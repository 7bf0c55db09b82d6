//! `minicontainer run`: run a command inside an isolated container.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use minicontainer_common::config::{CgroupLocation, RuntimeConfig};
use minicontainer_common::constants;
use minicontainer_common::types::{LaunchId, LaunchRequest, ResourceLimits};
use minicontainer_runtime::launcher;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Hostname inside the container.
    #[arg(long, default_value = constants::DEFAULT_HOSTNAME)]
    pub hostname: String,

    /// Name of the cgroup below the cgroup v2 mount.
    #[arg(long, default_value = constants::DEFAULT_CGROUP_NAME)]
    pub cgroup: String,

    /// Mount point of the cgroup v2 hierarchy.
    #[arg(long, default_value = constants::CGROUP_V2_PATH)]
    pub cgroup_root: PathBuf,

    /// Use a cgroup private to this launch and remove it afterwards.
    #[arg(long, conflicts_with = "cgroup")]
    pub unique_cgroup: bool,

    /// Memory ceiling in bytes.
    #[arg(long, default_value_t = constants::DEFAULT_MEMORY_BYTES)]
    pub memory_bytes: u64,

    /// CPU time allowed per period, in microseconds.
    #[arg(long, default_value_t = constants::DEFAULT_CPU_QUOTA_US)]
    pub cpu_quota_us: u64,

    /// CPU accounting period, in microseconds.
    #[arg(
        long,
        default_value_t = constants::DEFAULT_CPU_PERIOD_US,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub cpu_period_us: u64,

    /// Directory that becomes the container root.
    pub rootfs: PathBuf,

    /// Command and arguments to run (defaults to `/bin/sh`).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl RunArgs {
    /// Overlays the flags onto the default runtime configuration.
    #[must_use]
    pub fn runtime_config(&self, id: &LaunchId) -> RuntimeConfig {
        let config = RuntimeConfig {
            rootfs_dir: self.rootfs.clone(),
            hostname: self.hostname.clone(),
            cgroup: CgroupLocation {
                root: self.cgroup_root.clone(),
                name: self.cgroup.clone(),
            },
            limits: ResourceLimits {
                memory_bytes: self.memory_bytes,
                cpu_quota_us: self.cpu_quota_us,
                cpu_period_us: self.cpu_period_us,
            },
            ..RuntimeConfig::default()
        };
        if self.unique_cgroup {
            config.with_launch_cgroup(id)
        } else {
            config
        }
    }
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if the launch fails or the container exits non-zero.
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let id = LaunchId::generate();
    let _span = tracing::info_span!("launch", id = %id).entered();

    let config = args.runtime_config(&id);
    let request = LaunchRequest::from_argv(args.rootfs, args.command);
    launcher::launch(request, &config).context("container launch failed")
}
