//! Confined extraction of gzip-compressed tar archives.
//!
//! Entries are written in archive order. Each entry name is normalized
//! lexically and rejected if it still climbs out of the extraction root;
//! that check runs before anything touches the filesystem for the entry,
//! and the first violation aborts the whole extraction.

use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{self, BufReader, Read};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};

use minicontainer_common::error::{MinicontainerError, Result};
use tar::EntryType;

/// Mode for directories the archive implies but does not list.
const IMPLICIT_DIR_MODE: u32 = 0o755;

/// Permission bits kept from an entry's recorded mode.
const MODE_MASK: u32 = 0o7777;

/// What an extraction wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Directory entries created or reused.
    pub directories: usize,
    /// Regular files written.
    pub files: usize,
    /// Symbolic links created.
    pub symlinks: usize,
    /// Entries of other types (hard links, devices, FIFOs) that were skipped.
    pub skipped: usize,
}

/// Extracts the gzip-compressed tar archive at `archive_path` into `root`.
///
/// # Errors
///
/// - [`MinicontainerError::PathTraversal`] if an entry name escapes `root`.
/// - [`MinicontainerError::ArchiveFormat`] if the gzip or tar framing is
///   malformed.
/// - [`MinicontainerError::Filesystem`] if a directory, file, or symlink
///   cannot be created or written.
pub fn extract_archive(archive_path: &Path, root: &Path) -> Result<ExtractSummary> {
    tracing::info!(
        archive = %archive_path.display(),
        root = %root.display(),
        "extracting archive"
    );

    fs::create_dir_all(root).map_err(|e| fs_error(root, e))?;
    let file = File::open(archive_path).map_err(|e| fs_error(archive_path, e))?;
    let decoder = flate2::read::GzDecoder::new(BufReader::new(file));

    let summary = unpack_entries(tar::Archive::new(decoder), archive_path, root)?;
    tracing::info!(
        directories = summary.directories,
        files = summary.files,
        symlinks = summary.symlinks,
        skipped = summary.skipped,
        "archive extracted"
    );
    Ok(summary)
}

/// Writes every entry of an already-decoded tar stream below `root`.
///
/// `archive_path` is only used to label format errors.
///
/// # Errors
///
/// Same as [`extract_archive`].
pub fn unpack_entries<R: Read>(
    mut archive: tar::Archive<R>,
    archive_path: &Path,
    root: &Path,
) -> Result<ExtractSummary> {
    let format_error = |source: io::Error| MinicontainerError::ArchiveFormat {
        path: archive_path.to_path_buf(),
        source,
    };

    let mut summary = ExtractSummary::default();
    let mut directory_modes = Vec::new();

    for entry in archive.entries().map_err(format_error)? {
        let mut entry = entry.map_err(format_error)?;
        let raw_name = entry.path().map_err(format_error)?.into_owned();
        let target = root.join(confine(&raw_name)?);
        let mode = entry.header().mode().map_err(format_error)? & MODE_MASK;

        match entry.header().entry_type() {
            EntryType::Directory => {
                create_dir(&target)?;
                directory_modes.push((target, mode));
                summary.directories += 1;
            }
            EntryType::Regular => {
                write_file(&mut entry, &target, mode)?;
                summary.files += 1;
            }
            EntryType::Symlink => {
                let link = entry
                    .link_name()
                    .map_err(format_error)?
                    .ok_or_else(|| {
                        format_error(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("symlink {} has no target", raw_name.display()),
                        ))
                    })?
                    .into_owned();
                create_symlink(&link, &target)?;
                summary.symlinks += 1;
            }
            other => {
                tracing::debug!(entry = %raw_name.display(), kind = ?other, "skipping entry");
                summary.skipped += 1;
            }
        }
    }

    // Children before parents, so a read-only directory is locked only
    // after everything inside it has been written.
    directory_modes.sort_by(|a, b| b.0.cmp(&a.0));
    for (path, mode) in directory_modes {
        fs::set_permissions(&path, Permissions::from_mode(mode)).map_err(|e| fs_error(&path, e))?;
    }

    Ok(summary)
}

/// Lexically normalizes an entry name into a path relative to the root.
///
/// `.` segments are dropped, `..` removes the preceding normal segment,
/// and a leading `/` is stripped (at the root, `..` stays at the root).
/// A `..` with nothing left to remove on a relative name is kept.
#[must_use]
pub fn normalize_entry_name(name: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    let mut rooted = false;

    for component in name.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => rooted = true,
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    let _ = parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(component),
            },
            Component::Normal(_) => parts.push(component),
        }
    }

    parts.into_iter().collect()
}

/// Returns the normalized relative path of an entry, or rejects it if it
/// still contains a `..` component.
///
/// # Errors
///
/// Returns [`MinicontainerError::PathTraversal`] naming the raw entry.
pub fn confine(name: &Path) -> Result<PathBuf> {
    let normalized = normalize_entry_name(name);
    if normalized.components().any(|c| c == Component::ParentDir) {
        tracing::warn!(entry = %name.display(), "rejecting archive entry outside the root");
        return Err(MinicontainerError::PathTraversal {
            entry: name.to_path_buf(),
        });
    }
    Ok(normalized)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::DirBuilder::new()
        .recursive(true)
        .mode(IMPLICIT_DIR_MODE)
        .create(path)
        .map_err(|e| fs_error(path, e))
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir(parent),
        _ => Ok(()),
    }
}

fn write_file(contents: &mut impl Read, target: &Path, mode: u32) -> Result<()> {
    create_parent(target)?;

    // Truncating through a symlink left by an earlier entry would write
    // wherever the link points; replace the link instead.
    if fs::symlink_metadata(target).is_ok_and(|meta| meta.file_type().is_symlink()) {
        fs::remove_file(target).map_err(|e| fs_error(target, e))?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(target)
        .map_err(|e| fs_error(target, e))?;
    let _ = io::copy(contents, &mut file).map_err(|e| fs_error(target, e))?;

    // The open mode is filtered by the umask; the recorded bits are not.
    file.set_permissions(Permissions::from_mode(mode))
        .map_err(|e| fs_error(target, e))
}

fn create_symlink(link: &Path, target: &Path) -> Result<()> {
    create_parent(target)?;
    if fs::symlink_metadata(target).is_ok_and(|meta| !meta.is_dir()) {
        fs::remove_file(target).map_err(|e| fs_error(target, e))?;
    }
    std::os::unix::fs::symlink(link, target).map_err(|e| fs_error(target, e))
}

fn fs_error(path: &Path, source: io::Error) -> MinicontainerError {
    MinicontainerError::Filesystem {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_archive::{Item, write_archive};

    fn extract(items: &[Item<'_>]) -> (tempfile::TempDir, Result<ExtractSummary>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("image.tar.gz");
        write_archive(&archive, items);
        let result = extract_archive(&archive, &dir.path().join("root"));
        (dir, result)
    }

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).expect("metadata").permissions().mode() & MODE_MASK
    }

    #[test]
    fn normalize_collapses_dot_segments() {
        assert_eq!(normalize_entry_name(Path::new("./usr/./bin/sh")), PathBuf::from("usr/bin/sh"));
        assert_eq!(normalize_entry_name(Path::new("usr/lib/../bin")), PathBuf::from("usr/bin"));
    }

    #[test]
    fn normalize_strips_root_and_absorbs_parent_at_root() {
        assert_eq!(normalize_entry_name(Path::new("/etc/passwd")), PathBuf::from("etc/passwd"));
        assert_eq!(normalize_entry_name(Path::new("/../etc/passwd")), PathBuf::from("etc/passwd"));
    }

    #[test]
    fn normalize_keeps_unresolvable_parent() {
        assert_eq!(
            normalize_entry_name(Path::new("a/../../etc/passwd")),
            PathBuf::from("../etc/passwd")
        );
    }

    #[test]
    fn confine_rejects_escaping_names_only() {
        assert!(confine(Path::new("../../etc/passwd")).is_err());
        assert!(confine(Path::new("usr/../../x")).is_err());
        assert!(confine(Path::new("usr/share/doc..old/README")).is_ok());
        assert!(confine(Path::new("./")).is_ok());
    }

    #[test]
    fn regular_file_keeps_content_and_mode() {
        let (dir, result) = extract(&[
            Item::Dir("usr", 0o755),
            Item::File("usr/tool", 0o750, b"#!/bin/sh\necho hi\n"),
            Item::File("etc/motd", 0o640, b"welcome"),
        ]);
        let summary = result.expect("extract failed");
        assert_eq!(summary.files, 2);
        assert_eq!(summary.directories, 1);

        let root = dir.path().join("root");
        assert_eq!(fs::read(root.join("usr/tool")).expect("read"), b"#!/bin/sh\necho hi\n");
        assert_eq!(mode_of(&root.join("usr/tool")), 0o750);
        assert_eq!(fs::read(root.join("etc/motd")).expect("read"), b"welcome");
        assert_eq!(mode_of(&root.join("etc/motd")), 0o640);
    }

    #[test]
    fn traversal_aborts_before_touching_filesystem() {
        let (dir, result) = extract(&[
            Item::File("ok.txt", 0o644, b"fine"),
            Item::File("../escape.txt", 0o644, b"pwned"),
            Item::File("after.txt", 0o644, b"never"),
        ]);
        let err = result.expect_err("traversal must fail");
        assert!(
            matches!(&err, MinicontainerError::PathTraversal { entry } if entry == Path::new("../escape.txt"))
        );

        let root = dir.path().join("root");
        assert!(root.join("ok.txt").exists());
        assert!(!dir.path().join("escape.txt").exists());
        assert!(!root.join("after.txt").exists());
    }

    #[test]
    fn nested_traversal_is_rejected() {
        let (dir, result) = extract(&[Item::File("a/../../escape.txt", 0o644, b"x")]);
        assert!(matches!(result, Err(MinicontainerError::PathTraversal { .. })));
        assert!(!dir.path().join("escape.txt").exists());
        assert!(!dir.path().join("root/a").exists());
    }

    #[test]
    fn absolute_names_land_inside_root() {
        let (dir, result) = extract(&[Item::File("/etc/hostname", 0o644, b"box")]);
        let _ = result.expect("extract failed");
        assert_eq!(
            fs::read(dir.path().join("root/etc/hostname")).expect("read"),
            b"box"
        );
    }

    #[test]
    fn symlink_target_is_written_verbatim() {
        let (dir, result) = extract(&[
            Item::File("usr/bin/busybox", 0o755, b"elf"),
            Item::Symlink("bin/sh", "/usr/bin/busybox"),
            Item::Symlink("bin/ash", "../usr/bin/busybox"),
        ]);
        assert_eq!(result.expect("extract failed").symlinks, 2);

        let root = dir.path().join("root");
        assert_eq!(fs::read_link(root.join("bin/sh")).expect("link"), PathBuf::from("/usr/bin/busybox"));
        assert_eq!(fs::read_link(root.join("bin/ash")).expect("link"), PathBuf::from("../usr/bin/busybox"));
    }

    #[test]
    fn symlink_replaces_existing_file() {
        let (dir, result) = extract(&[
            Item::File("etc/localtime", 0o644, b"UTC"),
            Item::Symlink("etc/localtime", "/usr/share/zoneinfo/UTC"),
        ]);
        let _ = result.expect("extract failed");
        let meta = fs::symlink_metadata(dir.path().join("root/etc/localtime")).expect("metadata");
        assert!(meta.file_type().is_symlink());
    }

    #[test]
    fn regular_file_is_not_written_through_symlink() {
        let (dir, result) = extract(&[
            Item::Symlink("victim", "../outside.txt"),
            Item::File("victim", 0o644, b"data"),
        ]);
        let _ = result.expect("extract failed");

        let victim = dir.path().join("root/victim");
        assert!(fs::symlink_metadata(&victim).expect("metadata").is_file());
        assert_eq!(fs::read(&victim).expect("read"), b"data");
        assert!(!dir.path().join("outside.txt").exists());
    }

    #[test]
    fn read_only_directory_mode_applied_after_contents() {
        let (dir, result) = extract(&[
            Item::Dir("ro", 0o555),
            Item::File("ro/inside.txt", 0o644, b"x"),
        ]);
        let _ = result.expect("extract failed");

        let ro = dir.path().join("root/ro");
        assert!(ro.join("inside.txt").exists());
        assert_eq!(mode_of(&ro), 0o555);
        fs::set_permissions(&ro, Permissions::from_mode(0o755)).expect("restore mode");
    }

    #[test]
    fn pre_existing_directory_is_not_an_error() {
        let (_dir, result) = extract(&[Item::Dir("var", 0o755), Item::Dir("var/", 0o755)]);
        assert_eq!(result.expect("extract failed").directories, 2);
    }

    #[test]
    fn unsupported_entry_types_are_skipped() {
        let (dir, result) = extract(&[Item::Fifo("dev/initctl"), Item::File("a", 0o644, b"")]);
        let summary = result.expect("extract failed");
        assert_eq!(summary.skipped, 1);
        assert!(!dir.path().join("root/dev/initctl").exists());
    }

    #[test]
    fn garbage_input_is_archive_format_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("bad.tar.gz");
        fs::write(&archive, b"definitely not gzip").expect("write");
        let err = extract_archive(&archive, &dir.path().join("root")).expect_err("bad gzip");
        assert!(matches!(err, MinicontainerError::ArchiveFormat { .. }));
    }

    #[test]
    fn missing_archive_is_filesystem_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = extract_archive(&dir.path().join("missing.tar.gz"), &dir.path().join("root"))
            .expect_err("no archive");
        assert!(matches!(err, MinicontainerError::Filesystem { .. }));
    }
}
