//! Overlay directory listings.
//!
//! Merge policy: candidates are read in precedence order. A directory entry
//! whose name is already among the accumulated *directories* is dropped, so
//! the higher-precedence directory wins. Files are always appended, even
//! when the name repeats: a hand-written `a.go` and a generated `a.go` both
//! appear.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

use super::resolver::{PathClass, PathResolver};
use super::types::{DirEntry, FileType};
use crate::config::GENERATED_MIRROR;

/// Accumulates entries under the merge policy.
#[derive(Debug, Default)]
pub struct ListingMerger {
    entries: Vec<DirEntry>,
    directories: HashSet<String>,
}

impl ListingMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: DirEntry) {
        if entry.is_dir() && !self.directories.insert(entry.name.clone()) {
            return;
        }
        self.entries.push(entry);
    }

    /// Append every entry of a real directory. Missing or unreadable
    /// directories contribute nothing.
    pub fn extend_from_dir(&mut self, dir: &Path) -> bool {
        let Some(entries) = read_entries(dir) else {
            return false;
        };
        for entry in entries {
            self.push(entry);
        }
        true
    }

    pub fn into_entries(self) -> Vec<DirEntry> {
        self.entries
    }
}

/// Merge the listings of `candidates`, highest precedence first.
pub fn list_directory(candidates: &[PathBuf]) -> Vec<DirEntry> {
    let mut merger = ListingMerger::new();
    for candidate in candidates {
        merger.extend_from_dir(candidate);
    }
    merger.into_entries()
}

/// Like [`list_directory`], but `None` when no candidate is a readable
/// directory.
pub fn try_list_directory(candidates: &[PathBuf]) -> Option<Vec<DirEntry>> {
    let mut merger = ListingMerger::new();
    let mut found = false;
    for candidate in candidates {
        found |= merger.extend_from_dir(candidate);
    }
    found.then(|| merger.into_entries())
}

/// Listing of the mount root: the virtual prefix, the first component of
/// every existing pass-through root, then the merged top level of all
/// vendor roots.
pub fn list_root(resolver: &PathResolver) -> Vec<DirEntry> {
    let config = resolver.config();
    let ws = config.workspace_root();
    let mut merger = ListingMerger::new();

    merger.push(DirEntry::directory(config.virtual_prefix()));

    for root in config.pass_through_roots() {
        if !ws.join(root).exists() {
            continue;
        }
        if let Some(first) = root.components().next() {
            merger.push(DirEntry::directory(first.as_os_str().to_string_lossy()));
        }
    }

    for (_, vendor_root) in resolver.vendor_candidates(Path::new("")) {
        merger.extend_from_dir(&vendor_root);
    }

    merger.into_entries()
}

/// Listing of a directory on the way to a pass-through root (`tools` for
/// `tools/gopls`): only the entries leading further toward a root.
/// `None` when the directory does not exist.
pub fn list_pass_through_ancestor(resolver: &PathResolver, dir: &Path) -> Option<Vec<DirEntry>> {
    let config = resolver.config();
    let entries = try_list_directory(&resolver.candidates(PathClass::PassThrough(dir)))?;

    Some(
        entries
            .into_iter()
            .filter(|entry| {
                let child = dir.join(&entry.name);
                config.pass_through_root_of(&child).is_some()
                    || config.leads_to_pass_through(&child)
            })
            .collect(),
    )
}

/// Listing of the virtual prefix: the workspace's top-level directories,
/// minus hidden or ignored names, vendor directories and the generated
/// mirror.
pub fn list_first_party_root(resolver: &PathResolver) -> Vec<DirEntry> {
    let config = resolver.config();
    let Some(entries) = read_entries(config.workspace_root()) else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter(|entry| entry.is_dir())
        .filter(|entry| {
            entry.name != GENERATED_MIRROR
                && !config.is_ignored(&entry.name)
                && !config.is_vendor_dir(&entry.name)
        })
        .collect()
}

fn read_entries(dir: &Path) -> Option<Vec<DirEntry>> {
    let reader = match fs::read_dir(dir) {
        Ok(reader) => reader,
        Err(e) => {
            trace!(path = %dir.display(), error = %e, "skipping candidate");
            return None;
        }
    };

    let entries = reader
        .filter_map(Result::ok)
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follow symlinks: a linked package directory lists as a directory.
            let is_dir = fs::metadata(entry.path())
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            let kind = if is_dir { FileType::Directory } else { FileType::File };
            DirEntry::new(name, kind)
        })
        .collect();
    Some(entries)
}
