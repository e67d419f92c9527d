//! Conversions between overlay types and the FUSE wire types.

use bazelpath_kernel::{FileAttr, FileType, OpenFlags};

pub fn fuse_kind(kind: FileType) -> fuser::FileType {
    match kind {
        FileType::File => fuser::FileType::RegularFile,
        FileType::Directory => fuser::FileType::Directory,
        FileType::Symlink => fuser::FileType::Symlink,
    }
}

/// FUSE attributes for `attr`, reported under inode `ino`.
pub fn fuse_attr(attr: &FileAttr, ino: u64) -> fuser::FileAttr {
    fuser::FileAttr {
        ino,
        size: attr.size,
        blocks: attr.blocks,
        atime: attr.atime,
        mtime: attr.mtime,
        ctime: attr.ctime,
        crtime: attr.ctime,
        kind: fuse_kind(attr.kind),
        perm: attr.perm,
        nlink: attr.nlink,
        uid: attr.uid,
        gid: attr.gid,
        rdev: attr.rdev,
        blksize: attr.blksize,
        flags: 0,
    }
}

/// Decode `open(2)` flags.
pub fn open_flags(raw: i32) -> OpenFlags {
    let (read, write) = match raw & libc::O_ACCMODE {
        libc::O_WRONLY => (false, true),
        libc::O_RDWR => (true, true),
        _ => (true, false),
    };
    OpenFlags {
        read,
        write,
        append: raw & libc::O_APPEND != 0,
        truncate: raw & libc::O_TRUNC != 0,
        exclusive: raw & libc::O_EXCL != 0,
    }
}
