//! Types exchanged across the protocol boundary.
//!
//! Path-based and inode-free: the mounting layer owns inode numbering, so
//! `FileAttr::ino` is the real inode of the backing file, informational only.

use std::fs::{File, Metadata};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Kind of a real or synthetic entry. The overlay follows symlinks, so it
/// only reports `Symlink` for metadata taken without following.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

impl FileType {
    pub fn is_file(self) -> bool {
        self == Self::File
    }

    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }
}

/// File attributes (metadata), a stat passthrough of the backing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttr {
    /// Inode of the real file (0 for synthetic directories).
    pub ino: u64,
    /// Size in bytes.
    pub size: u64,
    /// Number of 512-byte blocks allocated.
    pub blocks: u64,
    /// File type.
    pub kind: FileType,
    /// Permission bits (mode & 0o7777).
    pub perm: u16,
    /// Last access time.
    pub atime: SystemTime,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Last status change time.
    pub ctime: SystemTime,
    /// Number of hard links.
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u32,
    /// Preferred I/O block size.
    pub blksize: u32,
}

impl FileAttr {
    /// Attributes of a synthetic directory (mount root, virtual prefix),
    /// with every timestamp set to `time`.
    ///
    /// Never touches real storage.
    pub fn directory(perm: u16, time: SystemTime) -> Self {
        let (uid, gid) = current_owner();
        Self {
            ino: 0,
            size: 0,
            blocks: 0,
            kind: FileType::Directory,
            perm,
            atime: time,
            mtime: time,
            ctime: time,
            nlink: 2, // . and ..
            uid,
            gid,
            rdev: 0,
            blksize: 4096,
        }
    }

    /// Convert `std::fs::Metadata` (from `stat`, symlinks followed).
    #[cfg(unix)]
    pub fn from_metadata(meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        let kind = if meta.is_dir() {
            FileType::Directory
        } else if meta.file_type().is_symlink() {
            FileType::Symlink
        } else {
            FileType::File
        };

        Self {
            ino: meta.ino(),
            size: meta.size(),
            blocks: meta.blocks(),
            kind,
            perm: (meta.mode() & 0o7777) as u16,
            atime: unix_time(meta.atime(), meta.atime_nsec()),
            mtime: unix_time(meta.mtime(), meta.mtime_nsec()),
            ctime: unix_time(meta.ctime(), meta.ctime_nsec()),
            nlink: meta.nlink() as u32,
            uid: meta.uid(),
            gid: meta.gid(),
            rdev: meta.rdev() as u32,
            blksize: meta.blksize() as u32,
        }
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

fn unix_time(secs: i64, nsec: i64) -> SystemTime {
    let nanos = nsec.clamp(0, 999_999_999) as u32;
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs as u64, nanos)
    } else {
        UNIX_EPOCH - Duration::new(secs.unsigned_abs(), 0) + Duration::new(0, nanos)
    }
}

#[cfg(unix)]
fn current_owner() -> (u32, u32) {
    (
        rustix::process::getuid().as_raw(),
        rustix::process::getgid().as_raw(),
    )
}

/// One name in a merged listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Bare name, never a path.
    pub name: String,
    pub kind: FileType,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FileType::File)
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Directory)
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Open file flags, decoded from the protocol's raw flags by the mounting
/// layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    /// `O_TRUNC`; ignored unless the open can write.
    pub truncate: bool,
    /// `O_EXCL`; only meaningful for create.
    pub exclusive: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self {
            read: true,
            write: false,
            append: false,
            truncate: false,
            exclusive: false,
        }
    }
}

impl OpenFlags {
    pub fn read() -> Self {
        Self::default()
    }

    /// Read-write.
    pub fn write() -> Self {
        Self {
            read: true,
            write: true,
            ..Default::default()
        }
    }

    /// Whether the open can modify the file.
    pub fn wants_write(&self) -> bool {
        self.write || self.append || self.truncate
    }

    pub(crate) fn options(&self) -> std::fs::OpenOptions {
        let mut options = std::fs::OpenOptions::new();
        options
            .read(self.read)
            .write(self.write)
            .append(self.append)
            .truncate(self.truncate && (self.write || self.append));
        options
    }
}

/// A real file opened through the overlay.
#[derive(Debug)]
pub struct OpenedFile {
    pub file: File,
    /// The candidate that won resolution.
    pub real_path: PathBuf,
}

/// `statvfs` of the file system holding the workspace root; field names
/// follow `struct statvfs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatFs {
    pub blocks: u64,
    pub bfree: u64,
    /// Blocks available to unprivileged users.
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub bsize: u32,
    pub namelen: u32,
    pub frsize: u32,
}

impl Default for StatFs {
    fn default() -> Self {
        Self {
            blocks: 0,
            bfree: 0,
            bavail: 0,
            files: 0,
            ffree: 0,
            bsize: 4096,
            namelen: 255,
            frsize: 4096,
        }
    }
}
