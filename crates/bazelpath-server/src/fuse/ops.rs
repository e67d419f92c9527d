//! Inode- and handle-level operations on top of [`VfsOps`].
//!
//! Everything here is synchronous and runs on a blocking worker; the
//! [`Filesystem`](fuser::Filesystem) impl only moves requests onto the
//! pool and sends replies.

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bazelpath_kernel::{FileAttr, FsError, FsResult, StatFs, VfsOps};
use dashmap::DashMap;
use fuser::FUSE_ROOT_ID;
use tracing::debug;

use super::convert::{fuse_attr, fuse_kind, open_flags};
use super::inode::InodeTable;

/// One slot of a directory listing snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirSlot {
    pub ino: u64,
    pub kind: fuser::FileType,
    pub name: OsString,
}

/// Inode and open-handle bookkeeping around an overlay.
pub struct FuseOps {
    fs: Arc<dyn VfsOps>,
    inodes: Arc<InodeTable>,
    files: DashMap<u64, Arc<File>>,
    dirs: DashMap<u64, Arc<Vec<DirSlot>>>,
    next_fh: AtomicU64,
}

impl FuseOps {
    pub fn new(fs: Arc<dyn VfsOps>, inodes: Arc<InodeTable>) -> Self {
        Self {
            fs,
            inodes,
            files: DashMap::new(),
            dirs: DashMap::new(),
            next_fh: AtomicU64::new(1),
        }
    }

    pub fn inodes(&self) -> &Arc<InodeTable> {
        &self.inodes
    }

    pub fn open_files(&self) -> usize {
        self.files.len()
    }

    fn path(&self, ino: u64) -> FsResult<PathBuf> {
        self.inodes
            .path(ino)
            .ok_or_else(|| FsError::not_found(format!("inode {ino}")))
    }

    fn child(&self, parent: u64, name: &OsStr) -> FsResult<PathBuf> {
        Ok(self.path(parent)?.join(name))
    }

    fn attr_at(&self, path: &Path, attr: &FileAttr) -> fuser::FileAttr {
        fuse_attr(attr, self.inodes.lookup_or_insert(path))
    }

    fn file(&self, fh: u64) -> FsResult<Arc<File>> {
        self.files
            .get(&fh)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| bad_handle(fh))
    }

    fn insert_file(&self, file: File) -> u64 {
        let fh = self.next_fh.fetch_add(1, Ordering::Relaxed);
        self.files.insert(fh, Arc::new(file));
        fh
    }

    // ------------------------------------------------------------------
    // Names and attributes
    // ------------------------------------------------------------------

    pub fn lookup(&self, parent: u64, name: &OsStr) -> FsResult<fuser::FileAttr> {
        let path = self.child(parent, name)?;
        let attr = self.fs.getattr(&path)?;
        Ok(self.attr_at(&path, &attr))
    }

    pub fn getattr(&self, ino: u64) -> FsResult<fuser::FileAttr> {
        let path = self.path(ino)?;
        let attr = self.fs.getattr(&path)?;
        Ok(fuse_attr(&attr, ino))
    }

    /// Only size changes are applied; other attribute changes are accepted
    /// and ignored.
    pub fn setattr(&self, ino: u64, size: Option<u64>) -> FsResult<fuser::FileAttr> {
        let path = self.path(ino)?;
        let attr = match size {
            Some(size) => self.fs.truncate(&path, size)?,
            None => self.fs.getattr(&path)?,
        };
        Ok(fuse_attr(&attr, ino))
    }

    pub fn access(&self, ino: u64, mask: i32) -> FsResult<()> {
        let path = self.path(ino)?;
        self.fs.access(&path, mask as u32)
    }

    pub fn statfs(&self) -> FsResult<StatFs> {
        self.fs.statfs()
    }

    // ------------------------------------------------------------------
    // Namespace changes
    // ------------------------------------------------------------------

    pub fn mkdir(&self, parent: u64, name: &OsStr, mode: u32) -> FsResult<fuser::FileAttr> {
        let path = self.child(parent, name)?;
        let attr = self.fs.mkdir(&path, mode)?;
        Ok(self.attr_at(&path, &attr))
    }

    pub fn rmdir(&self, parent: u64, name: &OsStr) -> FsResult<()> {
        let path = self.child(parent, name)?;
        self.fs.rmdir(&path)?;
        self.inodes.remove_subtree(&path);
        Ok(())
    }

    pub fn unlink(&self, parent: u64, name: &OsStr) -> FsResult<()> {
        let path = self.child(parent, name)?;
        self.fs.unlink(&path)?;
        self.inodes.remove_subtree(&path);
        Ok(())
    }

    pub fn rename(
        &self,
        parent: u64,
        name: &OsStr,
        new_parent: u64,
        new_name: &OsStr,
    ) -> FsResult<()> {
        let from = self.child(parent, name)?;
        let to = self.child(new_parent, new_name)?;
        self.fs.rename(&from, &to)?;
        self.inodes.rename_subtree(&from, &to);
        Ok(())
    }

    // ------------------------------------------------------------------
    // File handles
    // ------------------------------------------------------------------

    pub fn open(&self, ino: u64, flags: i32) -> FsResult<u64> {
        let path = self.path(ino)?;
        let opened = self.fs.open(&path, open_flags(flags))?;
        debug!(ino, real = %opened.real_path.display(), "opened");
        Ok(self.insert_file(opened.file))
    }

    pub fn create(
        &self,
        parent: u64,
        name: &OsStr,
        mode: u32,
        flags: i32,
    ) -> FsResult<(fuser::FileAttr, u64)> {
        let path = self.child(parent, name)?;
        let opened = self.fs.create(&path, open_flags(flags), mode)?;
        let attr = FileAttr::from_metadata(&opened.file.metadata()?);
        let attr = self.attr_at(&path, &attr);
        Ok((attr, self.insert_file(opened.file)))
    }

    /// Up to `size` bytes at `offset`; short only at end of file.
    pub fn read(&self, fh: u64, offset: i64, size: u32) -> FsResult<Vec<u8>> {
        let file = self.file(fh)?;
        let offset = file_offset(offset)?;
        let mut buf = vec![0; size as usize];
        let mut filled = 0;
        while filled < buf.len() {
            match file.read_at(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    pub fn write(&self, fh: u64, offset: i64, data: &[u8]) -> FsResult<u32> {
        let file = self.file(fh)?;
        file.write_all_at(data, file_offset(offset)?)?;
        Ok(data.len() as u32)
    }

    /// Nothing is buffered here; only the handle is checked.
    pub fn flush(&self, fh: u64) -> FsResult<()> {
        self.file(fh).map(drop)
    }

    pub fn fsync(&self, fh: u64, datasync: bool) -> FsResult<()> {
        let file = self.file(fh)?;
        if datasync {
            file.sync_data()?;
        } else {
            file.sync_all()?;
        }
        Ok(())
    }

    pub fn release(&self, fh: u64) {
        self.files.remove(&fh);
    }

    // ------------------------------------------------------------------
    // Directory handles
    // ------------------------------------------------------------------

    /// Snapshot the merged listing, `.` and `..` first.
    pub fn opendir(&self, ino: u64) -> FsResult<u64> {
        let path = self.path(ino)?;
        let entries = self.fs.readdir(&path)?;

        let parent = path
            .parent()
            .and_then(|parent| self.inodes.get(parent))
            .unwrap_or(FUSE_ROOT_ID);

        let mut slots = Vec::with_capacity(entries.len() + 2);
        slots.push(DirSlot {
            ino,
            kind: fuser::FileType::Directory,
            name: ".".into(),
        });
        slots.push(DirSlot {
            ino: parent,
            kind: fuser::FileType::Directory,
            name: "..".into(),
        });
        for entry in entries {
            let child = path.join(&entry.name);
            slots.push(DirSlot {
                ino: self.inodes.lookup_or_insert(&child),
                kind: fuse_kind(entry.kind),
                name: entry.name.into(),
            });
        }

        let fh = self.next_fh.fetch_add(1, Ordering::Relaxed);
        self.dirs.insert(fh, Arc::new(slots));
        Ok(fh)
    }

    pub fn listing(&self, fh: u64) -> FsResult<Arc<Vec<DirSlot>>> {
        self.dirs
            .get(&fh)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| bad_handle(fh))
    }

    pub fn releasedir(&self, fh: u64) {
        self.dirs.remove(&fh);
    }
}

fn bad_handle(fh: u64) -> FsError {
    debug!(fh, "unknown handle");
    FsError::Io(io::Error::from_raw_os_error(libc::EBADF))
}

fn file_offset(offset: i64) -> FsResult<u64> {
    u64::try_from(offset).map_err(|_| FsError::Io(io::Error::from_raw_os_error(libc::EINVAL)))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use bazelpath_kernel::{NamespaceConfig, OverlayFs};
    use tempfile::TempDir;

    use super::*;

    struct Fixture {
        _tmp: TempDir,
        ws: PathBuf,
        ops: FuseOps,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let ws = tmp.path().to_path_buf();
        fs::create_dir_all(ws.join("proj/api")).unwrap();
        fs::write(ws.join("proj/main.go"), b"package main\n").unwrap();
        fs::create_dir_all(ws.join("bazel-genfiles/proj/api")).unwrap();
        fs::write(ws.join("bazel-genfiles/proj/api/api.pb.go"), b"package api\n").unwrap();
        fs::create_dir_all(ws.join("third-party-go/vendor/github.com/x")).unwrap();

        let config = NamespaceConfig::builder("test.com", &ws)
            .vendor_root("third-party-go/vendor")
            .build()
            .unwrap();
        let overlay = OverlayFs::new(Arc::new(config));
        let ops = FuseOps::new(Arc::new(overlay), Arc::new(InodeTable::new()));
        Fixture { _tmp: tmp, ws, ops }
    }

    fn walk(ops: &FuseOps, path: &str) -> fuser::FileAttr {
        let mut ino = FUSE_ROOT_ID;
        let mut attr = None;
        for name in path.split('/') {
            let found = ops.lookup(ino, OsStr::new(name)).unwrap();
            ino = found.ino;
            attr = Some(found);
        }
        attr.unwrap()
    }

    #[test]
    fn test_lookup_assigns_stable_inodes() {
        let f = fixture();
        let dir = walk(&f.ops, "test.com/proj");
        assert_eq!(dir.kind, fuser::FileType::Directory);

        let again = walk(&f.ops, "test.com/proj");
        assert_eq!(dir.ino, again.ino);

        let generated = walk(&f.ops, "test.com/proj/api/api.pb.go");
        assert_eq!(generated.kind, fuser::FileType::RegularFile);
        assert_eq!(f.ops.getattr(generated.ino).unwrap().size, 12);

        let missing = f.ops.lookup(dir.ino, OsStr::new("nope.go")).unwrap_err();
        assert_eq!(missing.errno(), libc::ENOENT);
    }

    #[test]
    fn test_read_and_write_through_handles() {
        let f = fixture();
        let file = walk(&f.ops, "test.com/proj/main.go");

        let fh = f.ops.open(file.ino, libc::O_RDWR).unwrap();
        assert_eq!(f.ops.read(fh, 0, 4096).unwrap(), b"package main\n");
        assert_eq!(f.ops.read(fh, 8, 4).unwrap(), b"main");
        assert!(f.ops.read(fh, 100, 4).unwrap().is_empty());

        assert_eq!(f.ops.write(fh, 8, b"demo").unwrap(), 4);
        f.ops.flush(fh).unwrap();
        f.ops.fsync(fh, true).unwrap();
        f.ops.release(fh);
        assert_eq!(f.ops.open_files(), 0);
        assert_eq!(
            fs::read_to_string(f.ws.join("proj/main.go")).unwrap(),
            "package demo\n"
        );

        let err = f.ops.read(fh, 0, 1).unwrap_err();
        assert_eq!(err.errno(), libc::EBADF);
    }

    #[test]
    fn test_create_first_party_file() {
        let f = fixture();
        let proj = walk(&f.ops, "test.com/proj");

        let (attr, fh) = f
            .ops
            .create(proj.ino, OsStr::new("new.go"), 0o644, libc::O_WRONLY | libc::O_CREAT)
            .unwrap();
        assert_eq!(attr.kind, fuser::FileType::RegularFile);
        f.ops.write(fh, 0, b"package proj\n").unwrap();
        f.ops.release(fh);

        assert_eq!(f.ops.lookup(proj.ino, OsStr::new("new.go")).unwrap().ino, attr.ino);
        assert!(f.ws.join("proj/new.go").exists());

        let vendor = walk(&f.ops, "github.com");
        let err = f
            .ops
            .create(vendor.ino, OsStr::new("x.go"), 0o644, libc::O_WRONLY | libc::O_CREAT)
            .unwrap_err();
        assert_eq!(err.errno(), libc::ENOSYS);
    }

    #[test]
    fn test_setattr_truncates() {
        let f = fixture();
        let file = walk(&f.ops, "test.com/proj/main.go");
        let attr = f.ops.setattr(file.ino, Some(7)).unwrap();
        assert_eq!(attr.size, 7);
        assert_eq!(attr.ino, file.ino);
        assert_eq!(f.ops.setattr(file.ino, None).unwrap().size, 7);
    }

    #[test]
    fn test_rename_rebinds_inodes() {
        let f = fixture();
        let proj = walk(&f.ops, "test.com/proj");
        let file = walk(&f.ops, "test.com/proj/main.go");

        f.ops
            .rename(proj.ino, OsStr::new("main.go"), proj.ino, OsStr::new("cmd.go"))
            .unwrap();

        assert_eq!(
            f.ops.inodes().path(file.ino),
            Some(PathBuf::from("test.com/proj/cmd.go"))
        );
        assert_eq!(f.ops.getattr(file.ino).unwrap().size, 13);
        assert!(f.ws.join("proj/cmd.go").exists());
    }

    #[test]
    fn test_unlink_and_rmdir_forget_inodes() {
        let f = fixture();
        let proj = walk(&f.ops, "test.com/proj");
        let file = walk(&f.ops, "test.com/proj/main.go");

        f.ops.unlink(proj.ino, OsStr::new("main.go")).unwrap();
        assert_eq!(f.ops.inodes().path(file.ino), None);
        assert_eq!(f.ops.getattr(file.ino).unwrap_err().errno(), libc::ENOENT);

        let dir = f.ops.mkdir(proj.ino, OsStr::new("pkg"), 0o755).unwrap();
        assert_eq!(dir.kind, fuser::FileType::Directory);
        assert!(f.ws.join("proj/pkg").is_dir());

        f.ops.rmdir(proj.ino, OsStr::new("pkg")).unwrap();
        assert!(!f.ws.join("proj/pkg").exists());
        assert_eq!(f.ops.inodes().path(dir.ino), None);
    }

    #[test]
    fn test_opendir_snapshot() {
        let f = fixture();
        let api = walk(&f.ops, "test.com/proj/api");
        let proj = walk(&f.ops, "test.com/proj");

        let fh = f.ops.opendir(api.ino).unwrap();
        let listing = f.ops.listing(fh).unwrap();
        let names: Vec<_> = listing.iter().map(|slot| slot.name.to_string_lossy()).collect();
        assert_eq!(names, vec![".", "..", "api.pb.go"]);
        assert_eq!(listing[0].ino, api.ino);
        assert_eq!(listing[1].ino, proj.ino);
        assert_eq!(
            listing[2].ino,
            walk(&f.ops, "test.com/proj/api/api.pb.go").ino
        );

        // Later changes do not affect an open handle.
        fs::write(f.ws.join("proj/api/extra.go"), b"").unwrap();
        assert_eq!(f.ops.listing(fh).unwrap().len(), 3);

        f.ops.releasedir(fh);
        assert!(f.ops.listing(fh).is_err());
    }

    #[test]
    fn test_root_listing() {
        let f = fixture();
        let fh = f.ops.opendir(FUSE_ROOT_ID).unwrap();
        let listing = f.ops.listing(fh).unwrap();
        let names: Vec<_> = listing.iter().map(|slot| slot.name.to_string_lossy()).collect();
        assert_eq!(names, vec![".", "..", "test.com", "github.com"]);
        assert_eq!(listing[1].ino, FUSE_ROOT_ID);
    }

    #[test]
    fn test_access_and_statfs() {
        let f = fixture();
        f.ops.access(FUSE_ROOT_ID, libc::W_OK).unwrap();
        assert!(f.ops.statfs().unwrap().bsize > 0);
        assert_eq!(f.ops.access(999, libc::R_OK).unwrap_err().errno(), libc::ENOENT);
    }
}
