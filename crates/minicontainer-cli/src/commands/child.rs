//! `minicontainer child`: container init after the re-exec.
//!
//! Only the launcher invokes this verb, from inside the new namespaces.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use minicontainer_common::config::RuntimeConfig;
use minicontainer_common::constants;
use minicontainer_common::types::LaunchRequest;
use minicontainer_runtime::init;

/// Arguments for the hidden `child` command.
#[derive(Args, Debug)]
pub struct ChildArgs {
    /// Hostname to set inside the UTS namespace.
    #[arg(long, default_value = constants::DEFAULT_HOSTNAME)]
    pub hostname: String,

    /// Directory to chroot into.
    pub rootfs: PathBuf,

    /// Command and arguments to run.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Executes the `child` command.
///
/// # Errors
///
/// Returns an error if a setup step fails or the command exits non-zero.
pub fn execute(args: ChildArgs) -> anyhow::Result<()> {
    let config = RuntimeConfig {
        rootfs_dir: args.rootfs.clone(),
        hostname: args.hostname,
        ..RuntimeConfig::default()
    };
    let request = LaunchRequest::from_argv(args.rootfs, args.command);
    init::initialize(&request, &config).context("container init failed")
}
