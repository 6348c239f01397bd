use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Highest mode accepted from an octal string (permission and special bits).
const MAX_MODE: u32 = 0o7777;

/// Permission mask applied to bucket directories created by the filter.
///
/// Strings are always read as octal (`"0700"`, `"700"` and `"0o700"` are the
/// same mode); numbers are used as-is. Ignored on non-Unix platforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DirectoryMode(u32);

impl DirectoryMode {
    /// Owner-only access.
    pub const OWNER_ONLY: Self = Self(0o700);

    #[inline]
    #[must_use]
    pub const fn new(mode: u32) -> Self {
        Self(mode)
    }

    #[inline]
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }
}

impl Default for DirectoryMode {
    fn default() -> Self {
        Self::OWNER_ONLY
    }
}

impl From<u32> for DirectoryMode {
    fn from(mode: u32) -> Self {
        Self(mode)
    }
}

impl FromStr for DirectoryMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
        match u32::from_str_radix(digits, 8) {
            Ok(mode) if !digits.starts_with('+') && mode <= MAX_MODE => Ok(Self(mode)),
            _ => exn::bail!(ErrorKind::InvalidDirectoryMode(s.to_string())),
        }
    }
}

impl Display for DirectoryMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:04o}", self.0)
    }
}

/// A directory mode as it appears in named options: either a number taken
/// verbatim, or a string that must be parsed as octal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModeOption {
    Numeric(u32),
    Octal(String),
}

impl TryFrom<ModeOption> for DirectoryMode {
    type Error = Error;
    fn try_from(value: ModeOption) -> Result<Self, Self::Error> {
        match value {
            ModeOption::Numeric(mode) => Ok(Self::from(mode)),
            ModeOption::Octal(s) => s.parse(),
        }
    }
}
