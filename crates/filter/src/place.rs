//! Placement execution.
//!
//! One call digests the source, derives its bucket, makes sure the bucket
//! exists, resolves a collision according to the [`OverwritePolicy`] and
//! moves the source into place. The move is the only step that touches the
//! source, and it is the last one, so any failure before it leaves the source
//! where it was.

use crate::config::Config;
use crate::digest::Digest;
use crate::dirs::{create_tree, is_writable};
use crate::error::{ErrorKind, Result};
use crate::path::HashTree;
use crate::policy::OverwritePolicy;
use exn::{OptionExt, ResultExt};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::instrument;

/// Raw `EXDEV` ("cross-device link") on Linux and the BSDs.
#[cfg(unix)]
const EXDEV: i32 = 18;

/// Moves files into their content-addressed location.
///
/// A thin owner of a [`Config`]; every call to [`filter`](Self::filter) is
/// independent, so a single `Filter` can be shared between threads.
///
/// # Examples
///
/// ```no_run
/// use hashpath_filter::{Config, Filter};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let filter = Filter::new(Config::new("/srv/uploads")?);
/// let placed = filter.filter("/tmp/incoming/report.pdf")?;
/// println!("stored at {}", placed.display());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Filter {
    config: Config,
}

impl Filter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Move `source` into the store, returning where it ended up.
    ///
    /// See [`place`] for the exact sequence and its failure modes.
    pub fn filter(&self, source: impl AsRef<Path>) -> Result<PathBuf> {
        place(source.as_ref(), &self.config)
    }
}

impl From<Config> for Filter {
    fn from(config: Config) -> Self {
        Self::new(config)
    }
}

/// Move `source` to its content-addressed path under `config`'s base
/// directory and return that path.
///
/// 1. The source must exist and be a regular file; symbolic links are refused.
/// 2. Its content is digested with the configured algorithm.
/// 3. The digest selects the bucket directory ([`HashTree`]); missing buckets
///    are created best-effort with the configured mode.
/// 4. The file is named after its digest (plus its extension), or keeps its
///    own name.
/// 5. An occupied destination is replaced or refused according to the
///    [`OverwritePolicy`]. A file that already sits at its own destination is
///    left alone and its path returned.
/// 6. The source is renamed into place, or under [`OverwritePolicy::None`]
///    hard-linked and then unlinked so that a file appearing concurrently is
///    never replaced. If the store lives on another
///    filesystem, the content is copied next to the destination, atomically
///    persisted, and only then is the source removed.
///
/// # Errors
/// - [`ErrorKind::NotFound`] / [`ErrorKind::NotAFile`]: nothing to place.
/// - [`ErrorKind::Read`]: the source could not be digested.
/// - [`ErrorKind::DirectoryUnwritable`]: the bucket could not be made usable.
/// - [`ErrorKind::DestinationExists`]: occupied under [`OverwritePolicy::None`].
/// - [`ErrorKind::OverwriteFailed`]: the occupant could not be deleted.
/// - [`ErrorKind::MoveFailed`]: the final move failed; the source is untouched.
/// - [`ErrorKind::SourceRemovalFailed`]: the file is complete at the
///   destination (linked or copied) but the source could not be removed.
#[instrument(skip_all, fields(source = %source.display(), digest))]
pub fn place(source: &Path, config: &Config) -> Result<PathBuf> {
    // A rename moves a symlink itself, not its target, so links are refused.
    let metadata = match fs::symlink_metadata(source) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => exn::bail!(ErrorKind::NotFound(source.to_path_buf())),
        Err(e) => return Err(e).or_raise(|| ErrorKind::Read(source.to_path_buf())),
    };
    if !metadata.file_type().is_file() {
        exn::bail!(ErrorKind::NotAFile(source.to_path_buf()));
    }

    let digest = config.digest().digest_file(source)?;
    tracing::Span::current().record("digest", digest.as_str());

    let tree = HashTree::derive(config.base_dir(), config.directory_level(), digest.as_str());
    let bucket = tree.bucket_dir();
    if config.directory_level() > 0 && !is_writable(bucket) {
        // Most likely the buckets just don't exist yet.
        create_tree(tree.intermediate_dirs(), config.directory_mode());
        if !is_writable(bucket) {
            exn::bail!(ErrorKind::DirectoryUnwritable(bucket.to_path_buf()));
        }
    }

    let destination = tree.file_path(file_name(source, &digest, config.hash_filename())?);

    if fs::symlink_metadata(&destination).is_ok() {
        if is_same_file(source, &destination) {
            tracing::info!(destination = %destination.display(), "File is already in place");
            return Ok(destination);
        }
        match config.overwrite_policy() {
            OverwritePolicy::None => exn::bail!(ErrorKind::DestinationExists(destination)),
            OverwritePolicy::All => match fs::remove_file(&destination) {
                Ok(()) => tracing::debug!(destination = %destination.display(), "Removed existing file"),
                // Another placement got there first; the slot is free either way.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {},
                Err(e) => return Err(e).or_raise(|| ErrorKind::OverwriteFailed(destination)),
            },
        }
    }

    move_file(source, &destination, config.overwrite_policy())?;
    tracing::info!(destination = %destination.display(), "Placed file");
    Ok(destination)
}

/// Move `source` to `destination`, never replacing an existing file under
/// [`OverwritePolicy::None`].
///
/// A plain rename silently replaces whatever appeared at the destination since
/// it was checked, so the no-clobber move links the source into place first
/// and unlinks it afterwards. Filesystems without hard links fall back to a
/// rename.
fn move_file(source: &Path, destination: &Path, policy: OverwritePolicy) -> Result<()> {
    if policy == OverwritePolicy::None {
        match fs::hard_link(source, destination) {
            Ok(()) => {
                return fs::remove_file(source).or_raise(|| ErrorKind::SourceRemovalFailed(source.to_path_buf()));
            },
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                exn::bail!(ErrorKind::DestinationExists(destination.to_path_buf()))
            },
            Err(e) if is_cross_device(&e) => {
                tracing::debug!(destination = %destination.display(), "Cross-device move detected; falling back to copy");
                return copy_across_devices(source, destination, policy);
            },
            Err(e) => {
                tracing::debug!(destination = %destination.display(), error = %e, "Could not link file; falling back to rename");
            },
        }
    }
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            tracing::debug!(destination = %destination.display(), "Cross-device move detected; falling back to copy");
            copy_across_devices(source, destination, policy)
        },
        Err(e) => Err(e).or_raise(|| ErrorKind::MoveFailed(source.to_path_buf())),
    }
}

/// Destination file name: the digest plus the source's extension, or the
/// source's own name.
fn file_name(source: &Path, digest: &Digest, hashed: bool) -> Result<OsString> {
    if !hashed {
        return source
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_raise(|| ErrorKind::NotAFile(source.to_path_buf()));
    }
    let mut name = OsString::from(digest.as_str());
    if let Some(extension) = source.extension() {
        name.push(".");
        name.push(extension);
    }
    Ok(name)
}

fn is_same_file(source: &Path, destination: &Path) -> bool {
    match (fs::canonicalize(source), fs::canonicalize(destination)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn is_cross_device(e: &io::Error) -> bool {
    #[cfg(unix)]
    if e.raw_os_error() == Some(EXDEV) {
        return true;
    }
    e.kind() == io::ErrorKind::CrossesDevices
}

/// Relocate `source` when a rename can't cross filesystems.
///
/// The content is staged in a temporary file inside the destination's
/// directory and persisted under its final name in one rename, so readers
/// never see a partial file. The source is removed last.
fn copy_across_devices(source: &Path, destination: &Path, policy: OverwritePolicy) -> Result<()> {
    let move_failed = || ErrorKind::MoveFailed(source.to_path_buf());
    let staging_dir = destination.parent().ok_or_raise(move_failed)?;
    let mut reader = File::open(source).or_raise(move_failed)?;
    let mut staged = NamedTempFile::new_in(staging_dir).or_raise(move_failed)?;
    io::copy(&mut reader, staged.as_file_mut()).or_raise(move_failed)?;
    staged.as_file().sync_all().or_raise(move_failed)?;
    // A rename keeps the source's permissions; a copy has to restore them.
    if let Ok(metadata) = reader.metadata()
        && let Err(e) = staged.as_file().set_permissions(metadata.permissions())
    {
        tracing::warn!(destination = %destination.display(), error = %e, "Could not copy file permissions");
    }
    let persisted = match policy {
        OverwritePolicy::None => staged.persist_noclobber(destination),
        OverwritePolicy::All => staged.persist(destination),
    };
    // Dropping the returned temporary file removes the staged copy.
    match persisted.map_err(|e| e.error) {
        Ok(_) => {},
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            exn::bail!(ErrorKind::DestinationExists(destination.to_path_buf()))
        },
        Err(e) => return Err(e).or_raise(move_failed),
    }
    fs::remove_file(source).or_raise(|| ErrorKind::SourceRemovalFailed(source.to_path_buf()))
}
