use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// What to do when the destination of a placement is already occupied.
///
/// Defaults to [`All`](Self::All).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OverwritePolicy {
    /// Never replace an existing file; fail with
    /// [`DestinationExists`](ErrorKind::DestinationExists) instead.
    None,
    /// Delete whatever occupies the destination before moving. When two
    /// callers race for the same destination, the last one to move wins.
    #[default]
    All,
}

impl OverwritePolicy {
    /// Returns the short name for configuration (for displaying to user)
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OverwritePolicy::None => "none",
            OverwritePolicy::All => "all",
        }
    }
}

impl Display for OverwritePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl AsRef<str> for OverwritePolicy {
    fn as_ref(&self) -> &'static str {
        self.as_str()
    }
}

impl FromStr for OverwritePolicy {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(OverwritePolicy::None),
            "all" => Ok(OverwritePolicy::All),
            _ => exn::bail!(ErrorKind::InvalidOverwritePolicy(s.to_string())),
        }
    }
}
