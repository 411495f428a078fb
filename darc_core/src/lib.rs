//! # Darc Core
//!
//! Building blocks for a deduplicating archiver.
//!
//! This library provides the pieces an archiving pipeline needs before it ever
//! touches the disk: a compact integer codec for binary metadata records, the
//! include/exclude matcher that decides which files are processed, and the
//! parser for repository and archive locations given on the command line.
//!
//! ## Features
//!
//! - Base-128 varints for sizes, offsets and counts
//! - Ordered, first-match-wins include/exclude patterns
//! - `[[user@]host:]path[::archive]` locations with archive constraints
//! - Listing formatters and a concurrency-safe owner name cache
//!
//! None of these perform I/O.
//!
//! ## Example
//!
//! ```
//! use darc_core::{ArchiveRequirement, Location, Pattern, PatternList, varint};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let target = Location::validate("backup@nas:/srv/repo::monday", ArchiveRequirement::Required)?;
//! assert_eq!(target.archive(), Some("monday"));
//!
//! let patterns: PatternList = [Pattern::include("/home/me/src"), Pattern::exclude("/home/me")]
//!     .into_iter()
//!     .collect();
//! assert!(!patterns.excludes("/home/me/src/main.rs"));
//! assert!(patterns.excludes("/home/me/.cache/blob"));
//!
//! let bytes = varint::encode(300);
//! assert_eq!(varint::decode(&bytes)?, 300);
//! # Ok(())
//! # }
//! ```

mod cache;
mod error;
pub mod format;
mod location;
mod pattern;
pub mod varint;

pub use cache::{NameCache, OwnerLookup, OwnerNames};
pub use error::{Error, Result};
pub use location::{ArchiveRequirement, Location};
pub use pattern::{Pattern, PatternKind, PatternList, exclude_path};
