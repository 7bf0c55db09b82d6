//! Domain primitive types used across the minicontainer workspace.

use std::fmt;
use std::path::PathBuf;

use crate::constants;

/// Unique identifier for a single launch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LaunchId(String);

impl LaunchId {
    /// Creates a launch ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random launch ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LaunchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resource limits written into the container cgroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Hard memory ceiling (`memory.max`) in bytes.
    pub memory_bytes: u64,
    /// CPU time allowed per period (`cpu.max` quota).
    pub cpu_quota_us: u64,
    /// CPU accounting period (`cpu.max` period).
    pub cpu_period_us: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_bytes: constants::DEFAULT_MEMORY_BYTES,
            cpu_quota_us: constants::DEFAULT_CPU_QUOTA_US,
            cpu_period_us: constants::DEFAULT_CPU_PERIOD_US,
        }
    }
}

/// What to run, and where: built once from CLI input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Directory that becomes the container root.
    pub rootfs: PathBuf,
    /// Program to execute; `None` selects the default shell.
    pub command: Option<String>,
    /// Arguments passed to the program, in order.
    pub args: Vec<String>,
}

impl LaunchRequest {
    /// Builds a request from a rootfs path and a raw argv-style command line.
    ///
    /// The first element of `argv` is the program, the rest its arguments.
    #[must_use]
    pub fn from_argv(rootfs: impl Into<PathBuf>, argv: Vec<String>) -> Self {
        let mut argv = argv.into_iter();
        let command = argv.next();
        Self {
            rootfs: rootfs.into(),
            command,
            args: argv.collect(),
        }
    }

    /// Returns the command followed by its arguments.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        self.command
            .iter()
            .cloned()
            .chain(self.args.iter().cloned())
            .collect()
    }
}
