//! Hash-tree path derivation.
//!
//! Turns a digest into the chain of nested bucket directories a file is placed
//! in. Bucket names are successively longer digest prefixes, so each parent
//! has at most one child per digest character (16 for hex digests).

use std::path::{Path, PathBuf};

/// The bucket directories derived for one digest, rooted at a base directory.
///
/// Derivation is pure: nothing is read from or written to disk.
///
/// # Examples
///
/// ```
/// use hashpath_filter::HashTree;
/// use std::path::Path;
///
/// let tree = HashTree::derive("/store", 2, "abcdef12");
/// assert_eq!(tree.intermediate_dirs(), [Path::new("/store/a"), Path::new("/store/a/ab")]);
/// assert_eq!(tree.bucket_dir(), Path::new("/store/a/ab"));
/// assert_eq!(tree.file_path("abcdef12.txt"), Path::new("/store/a/ab/abcdef12.txt"));
///
/// // Level zero places files directly in the base directory.
/// let flat = HashTree::derive("/store", 0, "abcdef12");
/// assert!(flat.intermediate_dirs().is_empty());
/// assert_eq!(flat.bucket_dir(), Path::new("/store"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashTree {
    base: PathBuf,
    dirs: Vec<PathBuf>,
}

impl HashTree {
    /// Derive the bucket chain for `digest` under `base`, `level` directories
    /// deep.
    ///
    /// Segment `i` is named by the first `i` characters of `digest` and nests
    /// inside segment `i - 1`. A digest shorter than `level` clamps the depth
    /// to the digest's length; configured placements never hit this because
    /// [`Config`](crate::Config) rejects levels longer than its digest.
    pub fn derive(base: impl AsRef<Path>, level: usize, digest: &str) -> Self {
        let base = base.as_ref().to_path_buf();
        let depth = level.min(digest.chars().count());
        let mut current = base.clone();
        let dirs = (1..=depth)
            .map(|i| {
                current = current.join(prefix(digest, i));
                current.clone()
            })
            .collect();
        Self { base, dirs }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Deepest directory of the chain, where the file itself is placed.
    pub fn bucket_dir(&self) -> &Path {
        self.dirs.last().map(PathBuf::as_path).unwrap_or(&self.base)
    }

    /// Every directory that must exist for the bucket to exist, outermost
    /// first.
    pub fn intermediate_dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Effective number of directories between the base and the bucket.
    pub fn depth(&self) -> usize {
        self.dirs.len()
    }

    pub fn file_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.bucket_dir().join(file_name)
    }
}

/// First `n` characters of `s` (all of it if shorter).
fn prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}
