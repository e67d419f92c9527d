//! Filesystem protocol operations trait.

use std::path::Path;

use super::types::{DirEntry, FileAttr, OpenFlags, OpenedFile, StatFs};
use super::FsResult;

/// Filesystem protocol surface.
///
/// All operations take virtual paths relative to the mount root (a leading
/// `/` is tolerated). Implementations must be safe to call from many worker
/// threads at once.
pub trait VfsOps: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Attributes of the first existing candidate.
    fn getattr(&self, path: &Path) -> FsResult<FileAttr>;

    /// Merged directory listing.
    fn readdir(&self, path: &Path) -> FsResult<Vec<DirEntry>>;

    /// Open the first existing candidate.
    ///
    /// Write access is checked explicitly against the resolved real file and
    /// fails with [`FsError::PermissionDenied`](super::FsError::PermissionDenied).
    fn open(&self, path: &Path, flags: OpenFlags) -> FsResult<OpenedFile>;

    /// Always succeeds; enforcement happens in `open`/`create`.
    fn access(&self, path: &Path, mask: u32) -> FsResult<()>;

    /// Statistics of the file system backing the workspace.
    fn statfs(&self) -> FsResult<StatFs>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Create a file, first-party paths only.
    fn create(&self, path: &Path, flags: OpenFlags, mode: u32) -> FsResult<OpenedFile>;

    /// Create a directory and its missing parents.
    fn mkdir(&self, path: &Path, mode: u32) -> FsResult<FileAttr>;

    /// Remove a directory tree.
    fn rmdir(&self, path: &Path) -> FsResult<()>;

    /// Remove a file, first-party paths only.
    fn unlink(&self, path: &Path) -> FsResult<()>;

    /// Rename within one class of storage.
    fn rename(&self, from: &Path, to: &Path) -> FsResult<()>;

    /// Truncate the first existing candidate.
    fn truncate(&self, path: &Path, size: u64) -> FsResult<FileAttr>;
}
