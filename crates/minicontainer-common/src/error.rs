//! Unified error type for the minicontainer workspace.
//!
//! Every component returns these variants up through its contract; the CLI
//! entry point is the only place that turns one into a process exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Exit code used for every failure that is not a propagated child status.
pub const GENERIC_FAILURE_CODE: i32 = 1;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum MinicontainerError {
    /// The image download failed (transport error or non-2xx status).
    #[error("download of {url} failed: {reason}")]
    DownloadFailed {
        /// URL that was requested.
        url: String,
        /// Transport error or HTTP status description.
        reason: String,
    },

    /// The archive is not valid gzip/tar.
    #[error("malformed archive {path}: {source}")]
    ArchiveFormat {
        /// Archive being read.
        path: PathBuf,
        /// Underlying decoder error.
        source: std::io::Error,
    },

    /// An archive entry would land outside the extraction root.
    #[error("archive entry escapes the extraction root: {entry}")]
    PathTraversal {
        /// Entry name as recorded in the archive.
        entry: PathBuf,
    },

    /// Creating or writing a directory, file, or symlink failed.
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        /// Path where the operation failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The cached archive could not be removed after extraction.
    #[error("failed to remove cached archive {path}: {source}")]
    CleanupFailed {
        /// Archive path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The kernel rejected the namespace or ID-map configuration.
    #[error("namespace setup failed: {message}")]
    NamespaceSetup {
        /// Description of the rejected operation.
        message: String,
    },

    /// A `mount(2)` call failed.
    #[error("mount of {target} failed: {message}")]
    Mount {
        /// Mount point.
        target: PathBuf,
        /// Kernel error description.
        message: String,
    },

    /// An `umount(2)` call failed.
    #[error("unmount of {target} failed: {message}")]
    Unmount {
        /// Mount point.
        target: PathBuf,
        /// Kernel error description.
        message: String,
    },

    /// A cgroup directory or control file could not be written.
    #[error("cgroup error at {path}: {source}")]
    Cgroup {
        /// Cgroup directory or control file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The target command could not be started.
    #[error("failed to execute {program}: {source}")]
    Exec {
        /// Program that was resolved for execution.
        program: String,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// A child process ran but exited with a non-zero status.
    #[error("container process exited with status {code}")]
    ChildExited {
        /// Exit code reported by the kernel.
        code: i32,
    },

    /// A child process was terminated by a signal.
    #[error("container process killed by {signal}")]
    ChildSignaled {
        /// Signal name (e.g. `SIGKILL`).
        signal: String,
        /// Signal number.
        signo: i32,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },
}

impl MinicontainerError {
    /// Returns the process exit code this error should terminate with.
    ///
    /// A child's own non-zero status is passed through unchanged, signal
    /// deaths follow the shell convention of `128 + signo`, and every other
    /// failure maps to [`GENERIC_FAILURE_CODE`].
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ChildExited { code } => *code,
            Self::ChildSignaled { signo, .. } => 128 + *signo,
            _ => GENERIC_FAILURE_CODE,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MinicontainerError>;
