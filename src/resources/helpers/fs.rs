//! File-system resource helpers.
use anyhow::{Context as _, Result};
use filetime::FileTime;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::resources::error::ResourceError;

/// Suffix appended to a displaced target.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent: {}", parent.display()))?;
    }
    Ok(())
}

/// Whether a metadata lookup failed because nothing is at the path. An
/// ancestor that is a file counts: creating the parent is what fails then.
#[must_use]
pub fn is_absent(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
    )
}

/// Why `source` cannot be placed at `target`, if anything: the source is
/// missing, or the target's parent exists but is not a directory.
#[must_use]
pub fn placement_problem(source: &Path, target: &Path) -> Option<String> {
    if !source.exists() {
        return Some(
            ResourceError::MissingSource {
                path: source.display().to_string(),
            }
            .to_string(),
        );
    }
    target
        .parent()
        .filter(|parent| parent.exists() && !parent.is_dir())
        .map(|parent| {
            ResourceError::ParentNotDirectory {
                path: parent.display().to_string(),
            }
            .to_string()
        })
}

/// Remove whatever sits at `path`: a file, a symlink (including broken ones
/// and Windows junctions), or a real directory tree.
///
/// Links are removed themselves, never the directory they point at. Does
/// nothing if `path` does not exist.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_existing(path: &Path) -> Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(e).with_context(|| format!("reading metadata: {}", path.display()));
        }
    };

    if meta.is_symlink() {
        remove_link(path, &meta)
    } else if meta.is_dir() {
        std::fs::remove_dir_all(path)
            .with_context(|| format!("removing directory: {}", path.display()))
    } else {
        std::fs::remove_file(path).with_context(|| format!("removing file: {}", path.display()))
    }
}

/// Remove a symlink, handling platform differences.
///
/// On Windows, directory symlinks must be removed with `remove_dir` (not
/// `remove_file`). If `remove_dir` fails with OS error 5 (access denied), a
/// separate `cmd /c rmdir` process is tried.
fn remove_link(path: &Path, meta: &std::fs::Metadata) -> Result<()> {
    if is_dir_like(meta) {
        match std::fs::remove_dir(path) {
            Ok(()) => {}
            #[cfg(windows)]
            Err(e) if e.raw_os_error() == Some(5) => {
                remove_dir_fallback(path)?;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("removing link: {}", path.display()));
            }
        }
    } else {
        std::fs::remove_file(path).with_context(|| format!("removing link: {}", path.display()))?;
    }
    Ok(())
}

/// Check if metadata represents a directory-like entry.
/// On Windows, `symlink_metadata().is_dir()` returns `false` for directory symlinks,
/// so we check the raw `FILE_ATTRIBUTE_DIRECTORY` bit instead.
fn is_dir_like(meta: &std::fs::Metadata) -> bool {
    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        meta.file_attributes() & 0x10 != 0 // FILE_ATTRIBUTE_DIRECTORY
    }
    #[cfg(not(windows))]
    {
        meta.is_dir()
    }
}

#[cfg(windows)]
fn remove_dir_fallback(path: &Path) -> Result<()> {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    use std::os::windows::process::CommandExt;
    let output = std::process::Command::new("cmd")
        .arg("/c")
        .arg("rmdir")
        .arg("/q")
        .arg(path)
        .creation_flags(CREATE_NO_WINDOW)
        .output()
        .context("failed to run rmdir")?;
    if !output.status.success() {
        anyhow::bail!(
            "remove directory/symlink '{}': {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

/// The sibling `<name>.bak` path for `path`.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map_or_else(OsString::new, std::ffi::OsStr::to_os_string);
    name.push(BACKUP_SUFFIX);
    path.with_file_name(name)
}

/// Move `path` to its `.bak` sibling, removing any previous backup first.
///
/// Returns the backup location.
///
/// # Errors
///
/// Returns an error if the old backup cannot be removed or the rename fails.
pub fn backup_existing(path: &Path) -> Result<PathBuf> {
    let backup = backup_path(path);
    remove_existing(&backup)?;
    std::fs::rename(path, &backup)
        .with_context(|| format!("moving {} to {}", path.display(), backup.display()))?;
    Ok(backup)
}

/// Copy one file, carrying over its modification time.
///
/// # Errors
///
/// Returns an error if the copy or the timestamp update fails.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    std::fs::copy(src, dst)
        .with_context(|| format!("copying {} to {}", src.display(), dst.display()))?;
    let meta =
        std::fs::metadata(src).with_context(|| format!("reading metadata: {}", src.display()))?;
    filetime::set_file_mtime(dst, FileTime::from_last_modification_time(&meta))
        .with_context(|| format!("setting modification time: {}", dst.display()))?;
    Ok(())
}

/// Recursively copy a directory tree, preserving file modification times.
///
/// Symlinks within the source tree are *followed*: the function uses
/// [`Path::is_dir`] (which follows symlinks) so directory symlinks are
/// recursed into and their contents materialised rather than copying the
/// link itself.
///
/// # Errors
///
/// Returns an error if the destination directory cannot be created, a source
/// entry cannot be read, or a file cannot be copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)
        .with_context(|| format!("creating directory {}", dst.display()))?;
    for entry in
        std::fs::read_dir(src).with_context(|| format!("reading directory {}", src.display()))?
    {
        let entry = entry.with_context(|| format!("reading entry in {}", src.display()))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            copy_file(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn copies_files_and_subdirectories() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();

        std::fs::write(src.path().join("a.txt"), b"aaa").unwrap();
        std::fs::create_dir(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("sub/b.txt"), b"bbb").unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target).unwrap();

        assert_eq!(std::fs::read(target.join("a.txt")).unwrap(), b"aaa");
        assert_eq!(std::fs::read(target.join("sub/b.txt")).unwrap(), b"bbb");
    }

    #[test]
    fn copy_file_preserves_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::write(&src, b"x").unwrap();
        let past = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(&src, past).unwrap();

        copy_file(&src, &dst).unwrap();

        let meta = std::fs::metadata(&dst).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), past);
    }

    #[test]
    fn ensure_parent_dir_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("file.txt");
        ensure_parent_dir(&nested).unwrap();
        assert!(dir.path().join("a").join("b").exists());
    }

    #[test]
    fn remove_existing_removes_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("target");
        std::fs::write(&file, "content").unwrap();
        remove_existing(&file).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn remove_existing_removes_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        std::fs::create_dir_all(tree.join("nested")).unwrap();
        std::fs::write(tree.join("nested/file"), "x").unwrap();
        remove_existing(&tree).unwrap();
        assert!(!tree.exists());
    }

    #[test]
    fn remove_existing_noop_when_path_absent() {
        let dir = tempfile::tempdir().unwrap();
        remove_existing(&dir.path().join("nonexistent")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn remove_existing_removes_broken_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink("/nonexistent/target", &link).unwrap();
        remove_existing(&link).unwrap();
        assert!(link.symlink_metadata().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn remove_existing_leaves_link_destination_alone() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        std::fs::write(real.join("keep"), "x").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        remove_existing(&link).unwrap();

        assert!(link.symlink_metadata().is_err());
        assert!(real.join("keep").exists());
    }

    #[test]
    fn placement_problem_reports_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("absent");
        let reason = placement_problem(&source, &dir.path().join("t")).unwrap();
        assert!(reason.contains(&source.display().to_string()), "{reason}");
    }

    #[test]
    fn placement_problem_reports_file_parent() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        let blocker = dir.path().join("blocker");
        std::fs::write(&source, "x").unwrap();
        std::fs::write(&blocker, "x").unwrap();
        let reason = placement_problem(&source, &blocker.join("t")).unwrap();
        assert!(reason.contains("not a directory"), "{reason}");
        assert!(placement_problem(&source, &dir.path().join("missing/t")).is_none());
    }

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/home/u/.bashrc")),
            Path::new("/home/u/.bashrc.bak")
        );
    }

    #[test]
    fn backup_replaces_previous_backup() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("conf");
        std::fs::write(&target, "new").unwrap();
        std::fs::create_dir(dir.path().join("conf.bak")).unwrap();

        let backup = backup_existing(&target).unwrap();

        assert!(!target.exists());
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "new");
    }
}
