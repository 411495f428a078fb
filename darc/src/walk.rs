//! Filesystem walking for archive planning.

use anyhow::Result;
use darc_core::PatternList;
use std::collections::HashSet;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};

/// `(inode, device)` identifying a filesystem object.
pub type InodeKey = (u64, u64);

/// A path found by [`walk_path`] with its `lstat` metadata.
#[derive(Debug)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub metadata: Metadata,
}

/// Walk `root` and everything below it, parents before children.
///
/// Symlinks are reported but not followed. Entries excluded by `patterns`,
/// or whose inode is in `skip_inodes`, are dropped together with their
/// contents. Ignore files are not consulted; only `patterns` decides.
pub fn walk_path(
    root: &Path,
    skip_inodes: &HashSet<InodeKey>,
    patterns: &PatternList,
) -> Result<Box<dyn Iterator<Item = Result<WalkEntry>>>> {
    let root_metadata = fs::symlink_metadata(root)?;
    if !keep(root, &root_metadata, skip_inodes, patterns) {
        return Ok(Box::new(std::iter::empty()));
    }

    let skip = skip_inodes.clone();
    let filters = patterns.clone();
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false) // Patterns alone decide
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            match entry.path().symlink_metadata() {
                Ok(metadata) => keep(entry.path(), &metadata, &skip, &filters),
                // Let the walker surface the error.
                Err(_) => true,
            }
        })
        .build();

    Ok(Box::new(walker.map(|entry| {
        let entry = entry?;
        let metadata = entry.path().symlink_metadata()?;
        Ok(WalkEntry {
            path: entry.into_path(),
            metadata,
        })
    })))
}

fn keep(
    path: &Path,
    metadata: &Metadata,
    skip_inodes: &HashSet<InodeKey>,
    patterns: &PatternList,
) -> bool {
    if let Some(key) = inode_key(metadata)
        && skip_inodes.contains(&key)
    {
        log::debug!("skipping {} (inode in skip set)", path.display());
        return false;
    }
    if patterns.excludes(&path.to_string_lossy()) {
        log::debug!("excluding {}", path.display());
        return false;
    }
    true
}

/// Inode identity of `metadata`, where the platform has one.
#[cfg(unix)]
pub fn inode_key(metadata: &Metadata) -> Option<InodeKey> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.ino(), metadata.dev()))
}

/// Inode identity of `metadata` (Windows fallback).
#[cfg(not(unix))]
pub fn inode_key(_metadata: &Metadata) -> Option<InodeKey> {
    None
}
