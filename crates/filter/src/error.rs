//! Filter Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Filesystem errors are attached as
//! children of the kind describing which step of a placement failed, so the
//! caller can always tell *where* it went wrong without parsing strings.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A filter error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for filter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// ### Configuration Errors
/// Raised while building a [`Config`](crate::Config); nothing on disk has been
/// touched.
/// - [`ErrorKind::InvalidBaseDir`]
/// - [`ErrorKind::MissingBaseDir`]
/// - [`ErrorKind::InvalidOverwritePolicy`]
/// - [`ErrorKind::InvalidDirectoryMode`]
/// - [`ErrorKind::InvalidDirectoryLevel`]
/// - [`ErrorKind::InvalidDigest`]
///
/// ### Placement Errors
/// Raised by [`place`](crate::place). Every one of them leaves the source file
/// where it was, except [`ErrorKind::SourceRemovalFailed`] which leaves a
/// complete copy at the destination *and* the source in place.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Base directory is missing, not a directory, or not writable.
    #[display("base directory must be an existing, writable directory: {}", _0.display())]
    InvalidBaseDir(#[error(not(source))] PathBuf),
    /// Named options did not provide a base directory.
    #[display("base directory is required")]
    MissingBaseDir,
    #[display("unsupported overwrite policy: {_0}")]
    InvalidOverwritePolicy(#[error(not(source))] String),
    #[display("invalid directory mode (expected octal): {_0}")]
    InvalidDirectoryMode(#[error(not(source))] String),
    /// Requested more hash-tree levels than the digest has characters.
    #[display("directory level {level} exceeds digest length {max}")]
    InvalidDirectoryLevel { level: usize, max: usize },
    #[display("unsupported digest algorithm: {_0}")]
    InvalidDigest(#[error(not(source))] String),
    /// Source file does not exist.
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Source exists but is not a regular file.
    #[display("not a regular file: {}", _0.display())]
    NotAFile(#[error(not(source))] PathBuf),
    /// Source could not be read while computing its digest.
    #[display("could not read file: {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    /// Bucket directory is still not writable after trying to create it.
    #[display("directory is not writable: {}", _0.display())]
    DirectoryUnwritable(#[error(not(source))] PathBuf),
    /// Destination is occupied and the overwrite policy forbids replacing it.
    #[display("file already exists: {}", _0.display())]
    DestinationExists(#[error(not(source))] PathBuf),
    /// Previous occupant of the destination could not be deleted.
    #[display("could not remove existing file: {}", _0.display())]
    OverwriteFailed(#[error(not(source))] PathBuf),
    /// Final relocation of the source failed; the source is untouched.
    #[display("file could not be moved: {}", _0.display())]
    MoveFailed(#[error(not(source))] PathBuf),
    /// File is complete at the destination but the source could not be removed.
    #[display("file was placed but the source could not be removed: {}", _0.display())]
    SourceRemovalFailed(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Read(_) | Self::DirectoryUnwritable(_) | Self::MoveFailed(_))
    }

    /// Returns `true` if the error was raised while validating configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::InvalidBaseDir(_)
                | Self::MissingBaseDir
                | Self::InvalidOverwritePolicy(_)
                | Self::InvalidDirectoryMode(_)
                | Self::InvalidDirectoryLevel { .. }
                | Self::InvalidDigest(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;
    use rstest::rstest;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::InvalidOverwritePolicy("some".to_string()).to_string(),
            "unsupported overwrite policy: some"
        );
        assert_eq!(
            ErrorKind::InvalidDirectoryLevel { level: 9, max: 8 }.to_string(),
            "directory level 9 exceeds digest length 8"
        );
        assert_eq!(
            ErrorKind::DestinationExists(PathBuf::from("/store/a/ab/file.txt")).to_string(),
            "file already exists: /store/a/ab/file.txt"
        );
    }

    #[rstest]
    #[case(ErrorKind::Read(PathBuf::from("in.txt")), true)]
    #[case(ErrorKind::MoveFailed(PathBuf::from("in.txt")), true)]
    #[case(ErrorKind::DirectoryUnwritable(PathBuf::from("/store/a")), true)]
    #[case(ErrorKind::NotFound(PathBuf::from("in.txt")), false)]
    #[case(ErrorKind::DestinationExists(PathBuf::from("out.txt")), false)]
    #[case(ErrorKind::OverwriteFailed(PathBuf::from("out.txt")), false)]
    #[case(ErrorKind::InvalidOverwritePolicy("some".to_string()), false)]
    fn error_kind_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }

    #[test]
    fn error_kind_config() {
        assert!(ErrorKind::MissingBaseDir.is_config());
        assert!(ErrorKind::InvalidDirectoryLevel { level: 3, max: 2 }.is_config());
        assert!(!ErrorKind::MoveFailed(PathBuf::from("in.txt")).is_config());
    }

    #[test]
    fn error_from_io_result() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
        let err: Result<()> = result.or_raise(|| ErrorKind::OverwriteFailed(PathBuf::from("out.txt")));
        // Exn<E> implements Deref<Target = E>
        assert_eq!(*err.unwrap_err(), ErrorKind::OverwriteFailed(PathBuf::from("out.txt")));
    }
}
