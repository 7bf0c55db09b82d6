//! `minicontainer init`: provision the root filesystem.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use minicontainer_common::config::RuntimeConfig;
use minicontainer_common::constants;
use minicontainer_image::fetch::HttpFetcher;
use minicontainer_image::provision;

use crate::output;

/// Arguments for the `init` command.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory the image is extracted into.
    #[arg(long, default_value = constants::DEFAULT_ROOTFS_DIR)]
    pub rootfs: PathBuf,

    /// URL of the gzip-compressed rootfs tarball.
    #[arg(long, default_value = constants::DEFAULT_IMAGE_URL)]
    pub url: String,
}

/// Executes the `init` command.
///
/// # Errors
///
/// Returns an error if any provisioning step fails.
pub fn execute(args: &InitArgs) -> anyhow::Result<()> {
    let config = RuntimeConfig {
        rootfs_dir: args.rootfs.clone(),
        image_url: args.url.clone(),
        ..RuntimeConfig::default()
    };
    let fetcher = HttpFetcher::new()?;
    let tree = provision::provision(&config.rootfs_dir, &config.image_url, &fetcher, output::print_step)
        .with_context(|| format!("failed to provision {}", config.rootfs_dir.display()))?;

    if let Some(summary) = tree.extracted {
        output::print_summary(&summary);
    }
    Ok(())
}
