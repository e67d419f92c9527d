//! Kernel cache invalidation through the FUSE notification channel.

use std::io;
use std::path::Path;
use std::sync::Arc;

use bazelpath_kernel::Invalidator;
use fuser::{Notifier, FUSE_ROOT_ID};
use tracing::trace;

use super::inode::InodeTable;

/// [`Invalidator`] for a mounted session.
///
/// Only paths the kernel has looked up carry an inode number; anything
/// else has nothing cached and is skipped.
pub struct FuseInvalidator {
    notifier: Notifier,
    inodes: Arc<InodeTable>,
}

impl FuseInvalidator {
    pub fn new(notifier: Notifier, inodes: Arc<InodeTable>) -> Self {
        Self { notifier, inodes }
    }
}

impl Invalidator for FuseInvalidator {
    fn invalidate_entry(&self, virtual_path: &Path) -> io::Result<()> {
        let Some(name) = virtual_path.file_name() else {
            return Ok(());
        };
        let parent = match virtual_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => match self.inodes.get(parent) {
                Some(ino) => ino,
                None => return Ok(()),
            },
            _ => FUSE_ROOT_ID,
        };

        trace!(parent, name = ?name, "inval_entry");
        ignore_not_found(self.notifier.inval_entry(parent, name))
    }

    fn invalidate_file(&self, virtual_path: &Path) -> io::Result<()> {
        let Some(ino) = self.inodes.get(virtual_path) else {
            return Ok(());
        };

        trace!(ino, "inval_inode");
        ignore_not_found(self.notifier.inval_inode(ino, 0, 0))
    }
}

/// The kernel answers ENOENT when it already dropped the entry.
fn ignore_not_found(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
