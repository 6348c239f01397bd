//! Content-addressed file placement.
//!
//! Moves a file into a directory tree keyed by a digest of its content, so
//! that files spread evenly across buckets and identical content always lands
//! in the same place:
//!
//! ```text
//! /srv/store/
//! └── 7/
//!     └── 7f/
//!         └── 7f0c…e1.pdf
//! ```
//!
//! - **Digest** ([`Algorithm`]): BLAKE3 by default, CRC-32 for short names
//! - **Buckets** ([`HashTree`]): one nested directory per level, named by a
//!   growing digest prefix
//! - **Collisions** ([`OverwritePolicy`]): replace the occupant or refuse
//! - **Naming**: the digest plus the original extension, or the original name
//!
//! Everything is driven by a validated [`Config`], built directly or from
//! loosely-typed [`Options`]:
//!
//! ```no_run
//! use hashpath_filter::{Config, Filter, OverwritePolicy};
//!
//! # fn example() -> hashpath_filter::error::Result<()> {
//! let mut config = Config::new("/srv/store")?;
//! config.set_directory_level(3)?.set_overwrite_policy(OverwritePolicy::None);
//!
//! let placed = Filter::new(config).filter("/tmp/upload/report.pdf")?;
//! assert!(placed.starts_with("/srv/store"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod digest;
mod dirs;
pub mod error;
mod mode;
pub mod path;
mod place;
mod policy;

pub use crate::config::{Config, DEFAULT_DIRECTORY_LEVEL, Options};
pub use crate::digest::{Algorithm, Digest};
pub use crate::mode::{DirectoryMode, ModeOption};
pub use crate::path::HashTree;
pub use crate::place::{Filter, place};
pub use crate::policy::OverwritePolicy;
