//! Image source and its local cache location.
//!
//! A remote image is downloaded once into the rootfs directory and kept
//! there only until it has been extracted.

use std::path::{Path, PathBuf};

use minicontainer_common::constants;
use minicontainer_common::error::{MinicontainerError, Result};

/// Remote archive plus the path it is cached at while being provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSource {
    /// URL of the compressed rootfs archive.
    pub url: String,
    /// Where the downloaded archive is kept until extraction finishes.
    pub cached_archive_path: PathBuf,
}

impl ArchiveSource {
    /// Resolves `url` into a source cached inside `rootfs_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`MinicontainerError::Config`] unless the URL scheme is
    /// `http://` or `https://`.
    pub fn resolve(url: &str, rootfs_dir: &Path) -> Result<Self> {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(MinicontainerError::Config {
                message: format!("unsupported image source URL scheme: {url}"),
            });
        }
        let source = Self {
            url: url.to_string(),
            cached_archive_path: rootfs_dir.join(constants::ARCHIVE_NAME),
        };
        tracing::debug!(url, archive = %source.cached_archive_path.display(), "resolved image source");
        Ok(source)
    }

    /// Returns the path a download is streamed to before it is complete.
    #[must_use]
    pub fn partial_path(&self) -> PathBuf {
        let mut name = self.cached_archive_path.as_os_str().to_os_string();
        name.push(constants::PARTIAL_SUFFIX);
        PathBuf::from(name)
    }

    /// Returns whether a completed download is waiting to be extracted.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cached_archive_path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_source_is_cached_inside_rootfs() {
        let source = ArchiveSource::resolve("https://example.com/base.tar.gz", Path::new("rootfs"))
            .expect("resolve failed");
        assert_eq!(source.cached_archive_path, PathBuf::from("rootfs/minirootfs.tar.gz"));
        assert_eq!(source.partial_path(), PathBuf::from("rootfs/minirootfs.tar.gz.part"));
    }

    #[test]
    fn http_source_is_accepted() {
        assert!(ArchiveSource::resolve("http://example.com/base.tar.gz", Path::new("r")).is_ok());
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let err = ArchiveSource::resolve("ftp://example.com/base.tar.gz", Path::new("r"))
            .expect_err("ftp is not supported");
        assert!(matches!(err, MinicontainerError::Config { .. }));
    }

    #[test]
    fn is_cached_reflects_archive_presence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = ArchiveSource::resolve("https://example.com/a.tar.gz", dir.path())
            .expect("resolve failed");
        assert!(!source.is_cached());
        std::fs::write(&source.cached_archive_path, b"gz").expect("seed archive");
        assert!(source.is_cached());
    }
}
