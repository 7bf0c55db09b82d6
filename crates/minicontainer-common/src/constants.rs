//! System-wide constants and default paths.

/// Binary name for the CLI, also used as `argv[0]` of the re-exec'd child.
pub const BIN_NAME: &str = "minicontainer";

/// Sentinel verb selecting child mode on re-exec.
pub const CHILD_VERB: &str = "child";

/// Path of the running executable image, re-executed for child mode.
pub const SELF_EXE: &str = "/proc/self/exe";

/// Default rootfs directory, relative to the working directory.
pub const DEFAULT_ROOTFS_DIR: &str = "rootfs";

/// Default base image (Ubuntu 22.04 base, amd64).
pub const DEFAULT_IMAGE_URL: &str =
    "https://cdimage.ubuntu.com/ubuntu-base/releases/22.04/release/ubuntu-base-22.04-base-amd64.tar.gz";

/// File name of the cached archive inside the rootfs directory.
pub const ARCHIVE_NAME: &str = "minirootfs.tar.gz";

/// Suffix of the in-progress download next to the cached archive.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Suffix of the marker written next to the rootfs directory once
/// extraction completed; holds the source URL.
pub const PROVISION_MARKER: &str = ".minicontainer-source";

/// Upper bound for the image download, in seconds.
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 600;

/// Hostname set inside the UTS namespace.
pub const DEFAULT_HOSTNAME: &str = "cfm-container";

/// Command run when none is given.
pub const DEFAULT_COMMAND: &str = "/bin/sh";

/// Cgroups v2 unified hierarchy mount point.
pub const CGROUP_V2_PATH: &str = "/sys/fs/cgroup";

/// Name of the fixed container cgroup.
pub const DEFAULT_CGROUP_NAME: &str = "minicontainer";

/// Memory ceiling: 100 MB.
pub const DEFAULT_MEMORY_BYTES: u64 = 100_000_000;

/// CPU bandwidth quota per period (50% of one core with the default period).
pub const DEFAULT_CPU_QUOTA_US: u64 = 50_000;

/// CPU bandwidth period.
pub const DEFAULT_CPU_PERIOD_US: u64 = 100_000;
