//! Best-effort directory helpers shared by configuration and placement.

use crate::mode::DirectoryMode;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Whether files can be created in `dir` by this process.
///
/// Permission bits alone can't answer this (ACLs, read-only mounts, running
/// as root), so probe by creating an anonymous file that is discarded
/// immediately.
pub(crate) fn is_writable(dir: &Path) -> bool {
    dir.is_dir() && tempfile::tempfile_in(dir).is_ok()
}

/// Create each missing directory in `dirs` (outermost first) and apply `mode`.
///
/// Never fails: other placements may be creating the same buckets, so a
/// directory that already exists is expected, and anything else is only
/// logged. Callers check the outcome by testing the bucket afterwards.
pub(crate) fn create_tree(dirs: &[PathBuf], mode: DirectoryMode) {
    for dir in dirs {
        if dir.is_dir() {
            continue;
        }
        match create_dir(dir, mode) {
            Ok(()) => tracing::debug!(path = %dir.display(), mode = %mode, "Created bucket directory"),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                // Lost the race to another creator (or something else sits
                // at that path); leave its permissions alone either way.
                tracing::debug!(path = %dir.display(), "Bucket directory already exists");
                continue;
            },
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Could not create bucket directory");
                continue;
            },
        }
        // The creation mode is filtered through the process umask.
        if let Err(e) = set_mode(dir, mode) {
            tracing::warn!(path = %dir.display(), mode = %mode, error = %e, "Could not set bucket directory mode");
        }
    }
}

#[cfg(unix)]
fn create_dir(dir: &Path, mode: DirectoryMode) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().mode(mode.bits()).create(dir)
}

#[cfg(not(unix))]
fn create_dir(dir: &Path, _mode: DirectoryMode) -> io::Result<()> {
    fs::create_dir(dir)
}

#[cfg(unix)]
fn set_mode(dir: &Path, mode: DirectoryMode) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(dir, fs::Permissions::from_mode(mode.bits()))
}

#[cfg(not(unix))]
fn set_mode(_dir: &Path, _mode: DirectoryMode) -> io::Result<()> {
    Ok(())
}
