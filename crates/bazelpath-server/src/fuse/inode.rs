//! Inode number ↔ virtual path table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use fuser::FUSE_ROOT_ID;
use parking_lot::RwLock;

#[derive(Debug)]
struct Tables {
    paths: HashMap<u64, PathBuf>,
    inodes: HashMap<PathBuf, u64>,
    next: u64,
}

/// Stable inode numbers for virtual paths.
///
/// The root (`FUSE_ROOT_ID`) is the empty path. Numbers are allocated on
/// first lookup and never reused.
#[derive(Debug)]
pub struct InodeTable {
    tables: RwLock<Tables>,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    pub fn new() -> Self {
        let root = PathBuf::new();
        Self {
            tables: RwLock::new(Tables {
                paths: HashMap::from([(FUSE_ROOT_ID, root.clone())]),
                inodes: HashMap::from([(root, FUSE_ROOT_ID)]),
                next: FUSE_ROOT_ID + 1,
            }),
        }
    }

    pub fn path(&self, ino: u64) -> Option<PathBuf> {
        self.tables.read().paths.get(&ino).cloned()
    }

    pub fn get(&self, path: &Path) -> Option<u64> {
        self.tables.read().inodes.get(path).copied()
    }

    pub fn lookup_or_insert(&self, path: &Path) -> u64 {
        if let Some(ino) = self.get(path) {
            return ino;
        }

        let mut tables = self.tables.write();
        if let Some(&ino) = tables.inodes.get(path) {
            return ino;
        }
        let ino = tables.next;
        tables.next += 1;
        tables.paths.insert(ino, path.to_path_buf());
        tables.inodes.insert(path.to_path_buf(), ino);
        ino
    }

    /// Rebind `from` and everything below it under `to`, keeping inode
    /// numbers. Anything previously bound at `to` is dropped.
    pub fn rename_subtree(&self, from: &Path, to: &Path) {
        if from == to {
            return;
        }
        let mut tables = self.tables.write();
        remove_below(&mut tables, to);

        let moved: Vec<(PathBuf, u64)> = tables
            .inodes
            .iter()
            .filter(|(path, _)| path.starts_with(from))
            .map(|(path, &ino)| (path.clone(), ino))
            .collect();

        for (old, ino) in moved {
            let Ok(rest) = old.strip_prefix(from) else {
                continue;
            };
            let new = if rest.as_os_str().is_empty() {
                to.to_path_buf()
            } else {
                to.join(rest)
            };
            tables.inodes.remove(&old);
            tables.inodes.insert(new.clone(), ino);
            tables.paths.insert(ino, new);
        }
    }

    /// Forget `path` and everything below it.
    pub fn remove_subtree(&self, path: &Path) {
        let mut tables = self.tables.write();
        remove_below(&mut tables, path);
    }

    pub fn len(&self) -> usize {
        self.tables.read().paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remove_below(tables: &mut Tables, path: &Path) {
    // Never forget the root.
    if path.as_os_str().is_empty() {
        return;
    }
    let doomed: Vec<(PathBuf, u64)> = tables
        .inodes
        .iter()
        .filter(|(candidate, _)| candidate.starts_with(path))
        .map(|(candidate, &ino)| (candidate.clone(), ino))
        .collect();
    for (candidate, ino) in doomed {
        tables.inodes.remove(&candidate);
        tables.paths.remove(&ino);
    }
}
