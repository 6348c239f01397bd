//! Filter configuration.
//!
//! A [`Config`] is an owned value: build it once (directly, or from named
//! [`Options`]), adjust it through its setters, then hand it to
//! [`place`](crate::place) or a [`Filter`](crate::Filter). Nothing is shared
//! between placements, so concurrent callers each hold their own (or share one
//! immutably).

use crate::digest::Algorithm;
use crate::dirs::is_writable;
use crate::error::{Error, ErrorKind, Result};
use crate::mode::{DirectoryMode, ModeOption};
use crate::policy::OverwritePolicy;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hash-tree depth used unless configured otherwise.
pub const DEFAULT_DIRECTORY_LEVEL: usize = 2;

/// Validated filter configuration.
///
/// # Examples
///
/// ```no_run
/// use hashpath_filter::{Config, OverwritePolicy};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut config = Config::new("/srv/uploads")?;
/// config.set_directory_level(1)?.set_overwrite_policy(OverwritePolicy::None);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Canonical, writable root of every derived path.
    base_dir: PathBuf,
    directory_level: usize,
    directory_mode: DirectoryMode,
    overwrite_policy: OverwritePolicy,
    hash_filename: bool,
    digest: Algorithm,
}

impl Config {
    /// Create a configuration rooted at `base_dir`, with every other option at
    /// its default.
    ///
    /// # Errors
    /// Returns [`ErrorKind::InvalidBaseDir`] if `base_dir` does not exist, is
    /// not a directory, or is not writable.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            base_dir: validate_base_dir(base_dir.as_ref())?,
            directory_level: DEFAULT_DIRECTORY_LEVEL,
            directory_mode: DirectoryMode::default(),
            overwrite_policy: OverwritePolicy::default(),
            hash_filename: true,
            digest: Algorithm::default(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Replace the base directory. The new path is validated and stored in
    /// canonical form.
    pub fn set_base_dir(&mut self, base_dir: impl AsRef<Path>) -> Result<&mut Self> {
        self.base_dir = validate_base_dir(base_dir.as_ref())?;
        Ok(self)
    }

    pub fn directory_level(&self) -> usize {
        self.directory_level
    }

    /// Set the number of nested bucket directories (`0` disables bucketing).
    ///
    /// # Errors
    /// Returns [`ErrorKind::InvalidDirectoryLevel`] if `level` is longer than
    /// the configured digest.
    pub fn set_directory_level(&mut self, level: usize) -> Result<&mut Self> {
        check_level(level, self.digest)?;
        self.directory_level = level;
        Ok(self)
    }

    pub fn directory_mode(&self) -> DirectoryMode {
        self.directory_mode
    }

    pub fn set_directory_mode(&mut self, mode: impl Into<DirectoryMode>) -> &mut Self {
        self.directory_mode = mode.into();
        self
    }

    pub fn overwrite_policy(&self) -> OverwritePolicy {
        self.overwrite_policy
    }

    pub fn set_overwrite_policy(&mut self, policy: OverwritePolicy) -> &mut Self {
        self.overwrite_policy = policy;
        self
    }

    pub fn hash_filename(&self) -> bool {
        self.hash_filename
    }

    /// Rename placed files to their digest (keeping the extension) instead of
    /// keeping their original name.
    pub fn set_hash_filename(&mut self, enabled: bool) -> &mut Self {
        self.hash_filename = enabled;
        self
    }

    pub fn digest(&self) -> Algorithm {
        self.digest
    }

    /// # Errors
    /// Returns [`ErrorKind::InvalidDirectoryLevel`] if the current directory
    /// level is longer than digests produced by `algorithm`.
    pub fn set_digest(&mut self, algorithm: Algorithm) -> Result<&mut Self> {
        check_level(self.directory_level, algorithm)?;
        self.digest = algorithm;
        Ok(self)
    }
}

fn validate_base_dir(path: &Path) -> Result<PathBuf> {
    let canonical = path.canonicalize().or_raise(|| ErrorKind::InvalidBaseDir(path.to_path_buf()))?;
    if !is_writable(&canonical) {
        exn::bail!(ErrorKind::InvalidBaseDir(path.to_path_buf()));
    }
    Ok(canonical)
}

fn check_level(level: usize, algorithm: Algorithm) -> Result<()> {
    let max = algorithm.hex_len();
    if level > max {
        exn::bail!(ErrorKind::InvalidDirectoryLevel { level, max });
    }
    Ok(())
}

/// Named options, as supplied by a configuration file, the environment or the
/// command line.
///
/// Every field is optional so that sources can be layered; only `base_dir` is
/// required by the time a [`Config`] is built from it. Policy and digest names
/// are kept as strings so that an unknown value surfaces as the matching
/// [`ErrorKind`] rather than a deserialization failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_level: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_mode: Option<ModeOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_filename: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl TryFrom<Options> for Config {
    type Error = Error;
    fn try_from(options: Options) -> Result<Self> {
        let Some(base_dir) = options.base_dir else {
            exn::bail!(ErrorKind::MissingBaseDir);
        };
        let mut config = Config::new(base_dir)?;
        // Digest first: it bounds the directory level.
        if let Some(digest) = options.digest {
            config.set_digest(digest.parse()?)?;
        }
        if let Some(level) = options.directory_level {
            config.set_directory_level(level)?;
        }
        if let Some(mode) = options.directory_mode {
            config.set_directory_mode(DirectoryMode::try_from(mode)?);
        }
        if let Some(policy) = options.overwrite_policy {
            config.set_overwrite_policy(policy.parse()?);
        }
        if let Some(enabled) = options.hash_filename {
            config.set_hash_filename(enabled);
        }
        Ok(config)
    }
}
