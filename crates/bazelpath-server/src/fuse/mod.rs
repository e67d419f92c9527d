//! FUSE binding of the overlay.
//!
//! ```text
//!   kernel ──► fuser session thread ──► OverlayFuse (fuser::Filesystem)
//!                                          │ spawn_blocking per request
//!                                          ▼
//!                                       FuseOps ──► VfsOps (OverlayFs)
//!                                          │
//!                                          └─► reply from the worker
//! ```
//!
//! The session thread never touches real storage, so a slow lookup in one
//! directory does not stall requests for another.

mod convert;
mod inode;
mod invalidate;
mod ops;

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use tokio::runtime::Handle;
use tracing::{debug, info};

pub use convert::{fuse_attr, fuse_kind, open_flags};
pub use inode::InodeTable;
pub use invalidate::FuseInvalidator;
pub use ops::{DirSlot, FuseOps};

/// [`Filesystem`] running every request of [`FuseOps`] on the blocking
/// pool of a tokio runtime.
pub struct OverlayFuse {
    ops: Arc<FuseOps>,
    runtime: Handle,
    ttl: Duration,
}

impl OverlayFuse {
    pub fn new(ops: Arc<FuseOps>, runtime: Handle, ttl: Duration) -> Self {
        Self { ops, runtime, ttl }
    }

    fn run<F>(&self, op: F)
    where
        F: FnOnce(&FuseOps, Duration) + Send + 'static,
    {
        let ops = Arc::clone(&self.ops);
        let ttl = self.ttl;
        self.runtime.spawn_blocking(move || op(&ops, ttl));
    }
}

fn reply_entry(reply: ReplyEntry, ttl: &Duration, result: bazelpath_kernel::FsResult<FileAttr>) {
    match result {
        Ok(attr) => reply.entry(ttl, &attr, 0),
        Err(e) => reply.error(e.errno()),
    }
}

fn reply_empty(reply: ReplyEmpty, result: bazelpath_kernel::FsResult<()>) {
    match result {
        Ok(()) => reply.ok(),
        Err(e) => reply.error(e.errno()),
    }
}

impl Filesystem for OverlayFuse {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        info!("overlay mounted");
        Ok(())
    }

    fn destroy(&mut self) {
        info!(inodes = self.ops.inodes().len(), "overlay unmounted");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = name.to_os_string();
        self.run(move |ops, ttl| reply_entry(reply, &ttl, ops.lookup(parent, &name)));
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        self.run(move |ops, ttl| match ops.getattr(ino) {
            Ok(attr) => reply.attr(&ttl, &attr),
            Err(e) => reply.error(e.errno()),
        });
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        self.run(move |ops, ttl| match ops.setattr(ino, size) {
            Ok(attr) => reply.attr(&ttl, &attr),
            Err(e) => reply.error(e.errno()),
        });
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        reply: ReplyEntry,
    ) {
        let name = name.to_os_string();
        self.run(move |ops, ttl| {
            reply_entry(reply, &ttl, ops.mkdir(parent, &name, mode & !umask))
        });
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let name = name.to_os_string();
        self.run(move |ops, _| reply_empty(reply, ops.unlink(parent, &name)));
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let name = name.to_os_string();
        self.run(move |ops, _| reply_empty(reply, ops.rmdir(parent, &name)));
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        // RENAME_NOREPLACE / RENAME_EXCHANGE are not supported.
        if flags != 0 {
            reply.error(libc::EINVAL);
            return;
        }
        let name = name.to_os_string();
        let newname = newname.to_os_string();
        self.run(move |ops, _| {
            reply_empty(reply, ops.rename(parent, &name, newparent, &newname))
        });
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        self.run(move |ops, _| match ops.open(ino, flags) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e.errno()),
        });
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        let name = name.to_os_string();
        self.run(move |ops, ttl| {
            match ops.create(parent, &name, mode & !umask & 0o7777, flags) {
                Ok((attr, fh)) => reply.created(&ttl, &attr, 0, fh, 0),
                Err(e) => reply.error(e.errno()),
            }
        });
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        self.run(move |ops, _| match ops.read(fh, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        });
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let data = data.to_vec();
        self.run(move |ops, _| match ops.write(fh, offset, &data) {
            Ok(written) => reply.written(written),
            Err(e) => reply.error(e.errno()),
        });
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        self.run(move |ops, _| reply_empty(reply, ops.flush(fh)));
    }

    fn fsync(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        self.run(move |ops, _| reply_empty(reply, ops.fsync(fh, datasync)));
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        self.ops.release(fh);
        reply.ok();
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        self.run(move |ops, _| match ops.opendir(ino) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e.errno()),
        });
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let listing = match self.ops.listing(fh) {
            Ok(listing) => listing,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };

        // Offsets handed to the kernel are one past the slot index.
        let start = usize::try_from(offset).unwrap_or(0);
        for (index, slot) in listing.iter().enumerate().skip(start) {
            if reply.add(slot.ino, (index + 1) as i64, slot.kind, &slot.name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _flags: i32, reply: ReplyEmpty) {
        self.ops.releasedir(fh);
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        self.run(move |ops, _| match ops.statfs() {
            Ok(st) => reply.statfs(
                st.blocks, st.bfree, st.bavail, st.files, st.ffree, st.bsize, st.namelen, st.frsize,
            ),
            Err(e) => reply.error(e.errno()),
        });
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        debug!(ino, mask, "access");
        self.run(move |ops, _| reply_empty(reply, ops.access(ino, mask)));
    }
}
