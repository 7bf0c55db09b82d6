//! Rootfs provisioning: download once, extract, clean up.
//!
//! Progress is reported as numbered [`Step`]s through a caller-supplied
//! callback and mirrored as `tracing` events. A marker file recording the
//! source URL is written after a successful run, so a later run against
//! the same URL skips both the download and the extraction.

use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use minicontainer_common::constants;
use minicontainer_common::error::{MinicontainerError, Result};

use crate::extract::{self, ExtractSummary};
use crate::fetch::Fetch;
use crate::source::ArchiveSource;

/// A provisioning milestone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<'a> {
    /// The rootfs directory is being created.
    Preparing {
        /// Extraction root.
        root: &'a Path,
    },
    /// The archive is being downloaded.
    Downloading {
        /// Source URL.
        url: &'a str,
    },
    /// The download completed.
    Downloaded {
        /// Body size written to disk.
        bytes: u64,
    },
    /// A previously downloaded archive is reused.
    CachedArchive {
        /// Cached archive path.
        path: &'a Path,
    },
    /// The directory was already provisioned from this URL.
    AlreadyProvisioned {
        /// URL recorded in the marker.
        url: &'a str,
    },
    /// Entries are being written into the rootfs.
    Extracting {
        /// Extraction root.
        root: &'a Path,
    },
    /// The downloaded archive is being removed.
    CleaningUp {
        /// Archive path.
        path: &'a Path,
    },
    /// The rootfs is ready.
    Done {
        /// Extraction root.
        root: &'a Path,
    },
}

impl Step<'_> {
    /// Position of this step in the five-step sequence.
    #[must_use]
    pub const fn number(&self) -> u8 {
        match self {
            Self::Preparing { .. } => 1,
            Self::Downloading { .. }
            | Self::Downloaded { .. }
            | Self::CachedArchive { .. }
            | Self::AlreadyProvisioned { .. } => 2,
            Self::Extracting { .. } => 3,
            Self::CleaningUp { .. } => 4,
            Self::Done { .. } => 5,
        }
    }

    /// Whether this step means no network request is made.
    #[must_use]
    pub const fn skips_download(&self) -> bool {
        matches!(self, Self::CachedArchive { .. } | Self::AlreadyProvisioned { .. })
    }
}

impl fmt::Display for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preparing { root } => write!(f, "Preparing rootfs directory {}", root.display()),
            Self::Downloading { url } => write!(f, "Downloading minirootfs from {url}..."),
            Self::Downloaded { bytes } => write!(f, "Downloaded {bytes} bytes"),
            Self::CachedArchive { path } => {
                write!(f, "Archive already exists: {}, skipping download.", path.display())
            }
            Self::AlreadyProvisioned { url } => {
                write!(f, "Rootfs already provisioned from {url}, skipping download.")
            }
            Self::Extracting { root } => write!(f, "Extracting rootfs to {}...", root.display()),
            Self::CleaningUp { .. } => write!(f, "Cleaning up archive..."),
            Self::Done { root } => write!(f, "Done! Rootfs is ready in {}", root.display()),
        }
    }
}

/// A provisioned directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootfsTree {
    /// Root of the extracted filesystem.
    pub root: PathBuf,
    /// Bytes downloaded by this run, if a download happened.
    pub fetched_bytes: Option<u64>,
    /// What was written, if this run extracted anything.
    pub extracted: Option<ExtractSummary>,
}

/// Makes sure `rootfs_dir` holds the filesystem published at `url`.
///
/// # Errors
///
/// - [`MinicontainerError::Config`] for an unsupported URL scheme.
/// - [`MinicontainerError::DownloadFailed`] if the fetch fails; no partial
///   archive is left behind.
/// - Any extraction error from [`extract::extract_archive`].
/// - [`MinicontainerError::CleanupFailed`] if the archive cannot be
///   deleted after a successful extraction.
pub fn provision<F, P>(rootfs_dir: &Path, url: &str, fetcher: &F, mut progress: P) -> Result<RootfsTree>
where
    F: Fetch + ?Sized,
    P: FnMut(&Step<'_>),
{
    let source = ArchiveSource::resolve(url, rootfs_dir)?;

    report(&mut progress, &Step::Preparing { root: rootfs_dir });
    fs::create_dir_all(rootfs_dir).map_err(|e| MinicontainerError::Filesystem {
        path: rootfs_dir.to_path_buf(),
        source: e,
    })?;

    let fetched_bytes = if source.is_cached() {
        report(
            &mut progress,
            &Step::CachedArchive {
                path: &source.cached_archive_path,
            },
        );
        None
    } else if marker_matches(rootfs_dir, url) {
        report(&mut progress, &Step::AlreadyProvisioned { url });
        report(&mut progress, &Step::Done { root: rootfs_dir });
        return Ok(RootfsTree {
            root: rootfs_dir.to_path_buf(),
            fetched_bytes: None,
            extracted: None,
        });
    } else {
        report(&mut progress, &Step::Downloading { url });
        let bytes = download(&source, fetcher)?;
        report(&mut progress, &Step::Downloaded { bytes });
        Some(bytes)
    };

    report(&mut progress, &Step::Extracting { root: rootfs_dir });
    let summary = extract::extract_archive(&source.cached_archive_path, rootfs_dir)?;

    report(
        &mut progress,
        &Step::CleaningUp {
            path: &source.cached_archive_path,
        },
    );
    fs::remove_file(&source.cached_archive_path).map_err(|e| MinicontainerError::CleanupFailed {
        path: source.cached_archive_path.clone(),
        source: e,
    })?;
    write_marker(rootfs_dir, url)?;

    report(&mut progress, &Step::Done { root: rootfs_dir });
    Ok(RootfsTree {
        root: rootfs_dir.to_path_buf(),
        fetched_bytes,
        extracted: Some(summary),
    })
}

fn report<P: FnMut(&Step<'_>)>(progress: &mut P, step: &Step<'_>) {
    tracing::info!(step = step.number(), "{step}");
    progress(step);
}

/// Streams the archive to a `.part` file and renames it into place only
/// once the body has been fully written.
fn download<F: Fetch + ?Sized>(source: &ArchiveSource, fetcher: &F) -> Result<u64> {
    let partial = source.partial_path();
    let mut file = File::create(&partial).map_err(|e| MinicontainerError::Filesystem {
        path: partial.clone(),
        source: e,
    })?;

    let fetched = fetcher.fetch(&source.url, &mut file).and_then(|bytes| {
        file.sync_all().map_err(|e| MinicontainerError::Filesystem {
            path: partial.clone(),
            source: e,
        })?;
        Ok(bytes)
    });
    drop(file);

    match fetched {
        Ok(bytes) => {
            fs::rename(&partial, &source.cached_archive_path).map_err(|e| {
                MinicontainerError::Filesystem {
                    path: source.cached_archive_path.clone(),
                    source: e,
                }
            })?;
            Ok(bytes)
        }
        Err(e) => {
            if let Err(remove_err) = fs::remove_file(&partial) {
                tracing::warn!(path = %partial.display(), error = %remove_err, "failed to remove partial download");
            }
            Err(e)
        }
    }
}

/// Path of the provisioning marker: a sibling of the rootfs directory
/// (`rootfs` gets `rootfs.minicontainer-source`), so the container never
/// sees it.
///
/// A directory without a final name (`.`, `/`) is resolved first; the
/// filesystem root keeps the marker inside itself.
#[must_use]
pub fn marker_path(rootfs_dir: &Path) -> PathBuf {
    let resolved = if rootfs_dir.file_name().is_some() {
        rootfs_dir.to_path_buf()
    } else {
        fs::canonicalize(rootfs_dir).unwrap_or_else(|_| rootfs_dir.to_path_buf())
    };
    match resolved.file_name() {
        Some(name) => {
            let mut marker = name.to_os_string();
            marker.push(constants::PROVISION_MARKER);
            resolved.with_file_name(marker)
        }
        None => resolved.join(constants::PROVISION_MARKER),
    }
}

fn marker_matches(rootfs_dir: &Path, url: &str) -> bool {
    match fs::read_to_string(marker_path(rootfs_dir)) {
        Ok(recorded) => recorded.trim() == url,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable provisioning marker, provisioning again");
            false
        }
    }
}

fn write_marker(rootfs_dir: &Path, url: &str) -> Result<()> {
    let path = marker_path(rootfs_dir);
    fs::write(&path, format!("{url}\n")).map_err(|e| MinicontainerError::Filesystem { path, source: e })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io::Write;

    use super::*;
    use crate::test_archive::{Item, write_archive};

    const URL: &str = "https://images.example.com/base.tar.gz";

    /// Serves a fixed archive and counts requests.
    struct CannedFetcher {
        body: Vec<u8>,
        calls: Cell<usize>,
    }

    impl CannedFetcher {
        fn new(items: &[Item<'_>]) -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = dir.path().join("a.tar.gz");
            write_archive(&path, items);
            Self {
                body: fs::read(&path).expect("read archive"),
                calls: Cell::new(0),
            }
        }
    }

    impl Fetch for CannedFetcher {
        fn fetch(&self, _url: &str, dest: &mut dyn Write) -> Result<u64> {
            self.calls.set(self.calls.get() + 1);
            dest.write_all(&self.body).expect("write body");
            Ok(self.body.len() as u64)
        }
    }

    struct FailingFetcher;

    impl Fetch for FailingFetcher {
        fn fetch(&self, url: &str, dest: &mut dyn Write) -> Result<u64> {
            dest.write_all(b"half a gzip stre").expect("write");
            Err(MinicontainerError::DownloadFailed {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".into(),
            })
        }
    }

    #[test]
    fn fresh_provision_downloads_extracts_and_cleans_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("rootfs");
        let fetcher = CannedFetcher::new(&[Item::File("bin/sh", 0o755, b"#!")]);
        let mut seen = Vec::new();

        let tree = provision(&root, URL, &fetcher, |s| seen.push(s.number())).expect("provision");

        assert_eq!(fetcher.calls.get(), 1);
        assert_eq!(seen, vec![1, 2, 2, 3, 4, 5]);
        assert_eq!(tree.fetched_bytes, Some(fetcher.body.len() as u64));
        assert_eq!(tree.extracted.map(|s| s.files), Some(1));
        assert!(root.join("bin/sh").is_file());
        assert!(!root.join(constants::ARCHIVE_NAME).exists());
        assert!(marker_path(&root).is_file());
    }

    #[test]
    fn second_run_with_same_url_skips_download_and_extraction() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("rootfs");
        let fetcher = CannedFetcher::new(&[Item::File("etc/os-release", 0o644, b"ID=test\n")]);
        let _ = provision(&root, URL, &fetcher, |_| {}).expect("first run");

        let mut skipped = false;
        let tree = provision(&root, URL, &fetcher, |s| skipped |= s.skips_download())
            .expect("second run");

        assert_eq!(fetcher.calls.get(), 1);
        assert!(skipped);
        assert_eq!(tree.extracted, None);
        assert_eq!(
            fs::read_to_string(root.join("etc/os-release")).expect("read"),
            "ID=test\n"
        );
    }

    #[test]
    fn different_url_downloads_again() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("rootfs");
        let fetcher = CannedFetcher::new(&[Item::File("a", 0o644, b"a")]);
        let _ = provision(&root, URL, &fetcher, |_| {}).expect("first run");
        let _ = provision(&root, "https://images.example.com/other.tar.gz", &fetcher, |_| {})
            .expect("second run");
        assert_eq!(fetcher.calls.get(), 2);
    }

    #[test]
    fn cached_archive_is_extracted_without_fetching() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("rootfs");
        fs::create_dir_all(&root).expect("mkdir");
        write_archive(
            &root.join(constants::ARCHIVE_NAME),
            &[Item::File("cached.txt", 0o644, b"from cache")],
        );
        let fetcher = CannedFetcher::new(&[]);

        let mut steps = Vec::new();
        let tree = provision(&root, URL, &fetcher, |s| steps.push(s.to_string())).expect("provision");

        assert_eq!(fetcher.calls.get(), 0);
        assert_eq!(tree.fetched_bytes, None);
        assert!(steps.iter().any(|s| s.contains("skipping download")));
        assert_eq!(fs::read(root.join("cached.txt")).expect("read"), b"from cache");
        assert!(!root.join(constants::ARCHIVE_NAME).exists());
    }

    #[test]
    fn failed_download_leaves_no_archive_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("rootfs");

        let err = provision(&root, URL, &FailingFetcher, |_| {}).expect_err("fetch fails");

        assert!(matches!(err, MinicontainerError::DownloadFailed { .. }));
        assert!(!root.join(constants::ARCHIVE_NAME).exists());
        assert!(!root.join(format!("{}{}", constants::ARCHIVE_NAME, constants::PARTIAL_SUFFIX)).exists());
        assert!(!marker_path(&root).exists());
    }

    #[test]
    fn hostile_archive_fails_and_is_not_marked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("rootfs");
        let fetcher = CannedFetcher::new(&[Item::File("../../outside", 0o644, b"x")]);

        let err = provision(&root, URL, &fetcher, |_| {}).expect_err("traversal");

        assert!(matches!(err, MinicontainerError::PathTraversal { .. }));
        assert!(!dir.path().join("outside").exists());
        assert!(!marker_path(&root).exists());
    }

    #[test]
    fn unsupported_scheme_fails_before_creating_anything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("rootfs");
        let fetcher = CannedFetcher::new(&[]);

        let err = provision(&root, "file:///tmp/a.tar.gz", &fetcher, |_| {}).expect_err("scheme");

        assert!(matches!(err, MinicontainerError::Config { .. }));
        assert!(!root.exists());
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn marker_lives_beside_the_rootfs() {
        assert_eq!(marker_path(Path::new("rootfs")), PathBuf::from("rootfs.minicontainer-source"));
        assert_eq!(
            marker_path(Path::new("/srv/images/rootfs/")),
            PathBuf::from("/srv/images/rootfs.minicontainer-source")
        );
    }

    #[test]
    fn provisioned_tree_contains_no_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("rootfs");
        let fetcher = CannedFetcher::new(&[Item::File("etc/hostname", 0o644, b"box\n")]);
        let _ = provision(&root, URL, &fetcher, |_| {}).expect("provision");

        let names: Vec<_> = fs::read_dir(&root)
            .expect("read rootfs")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(names, ["etc"]);
        assert_eq!(
            fs::read_to_string(dir.path().join("rootfs.minicontainer-source")).expect("marker"),
            format!("{URL}\n")
        );
    }

    #[test]
    fn step_numbers_follow_the_sequence() {
        let root = Path::new("rootfs");
        assert_eq!(Step::Preparing { root }.number(), 1);
        assert_eq!(Step::AlreadyProvisioned { url: URL }.number(), 2);
        assert_eq!(Step::Extracting { root }.number(), 3);
        assert_eq!(Step::CleaningUp { path: root }.number(), 4);
        assert_eq!(Step::Done { root }.number(), 5);
        assert!(!Step::Downloading { url: URL }.skips_download());
    }
}
