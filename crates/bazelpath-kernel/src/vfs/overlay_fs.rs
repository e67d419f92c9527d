//! The namespace overlay as a [`VfsOps`] implementation.
//!
//! Every operation classifies its path once and matches on the
//! [`PathClass`]. Routing summary:
//!
//! | class            | lookups              | mkdir / rmdir      | create / unlink |
//! |------------------|----------------------|--------------------|-----------------|
//! | root, prefix     | synthetic directory  | exists / refused   | unsupported     |
//! | first-party      | `ws/rel`, mirror     | `ws/rel`           | `ws/rel`        |
//! | pass-through     | `ws/path` only       | first vendor root  | unsupported     |
//! | vendor           | each vendor, mirror  | first vendor root  | unsupported     |
//! | unclassified     | not found            | not found          | unsupported     |
//!
//! Renames between two first-party paths happen under the workspace; every
//! other pairing happens inside the vendor root that holds the old path.
//! Pass-through trees are read through but never restructured.

use std::fs::{self, Metadata, OpenOptions};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use super::error::{FsError, FsResult};
use super::ops::VfsOps;
use super::overlay;
use super::resolver::{PathClass, PathResolver};
use super::types::{DirEntry, FileAttr, OpenFlags, OpenedFile, StatFs};
use crate::config::NamespaceConfig;

/// Permission bits reported for the synthetic directories.
const SYNTHETIC_DIR_PERM: u16 = 0o755;

/// Filesystem protocol adapter over a [`PathResolver`].
///
/// Holds only the immutable configuration; cloning is cheap and clones may
/// serve requests concurrently.
#[derive(Debug, Clone)]
pub struct OverlayFs {
    resolver: PathResolver,
    /// Timestamp of the synthetic directories.
    created: SystemTime,
}

impl OverlayFs {
    pub fn new(config: Arc<NamespaceConfig>) -> Self {
        Self {
            resolver: PathResolver::new(config),
            created: SystemTime::now(),
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    fn workspace(&self) -> &Path {
        self.resolver.config().workspace_root()
    }

    /// Real location for mkdir/rmdir of a non-synthetic path.
    fn directory_target(&self, class: PathClass<'_>, path: &Path) -> FsResult<PathBuf> {
        let ws = self.workspace();
        match class {
            PathClass::FirstPartyChild(rel) => Ok(ws.join(rel)),
            PathClass::PassThrough(rel) | PathClass::Vendor(rel) => self
                .resolver
                .config()
                .vendor_roots()
                .first()
                .map(|vendor| ws.join(vendor).join(rel))
                .ok_or_else(|| FsError::not_found(display(path))),
            PathClass::Unclassified => Err(FsError::not_found(display(path))),
            PathClass::Root | PathClass::FirstPartyRoot => {
                Err(FsError::not_supported(display(path)))
            }
        }
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// First candidate that exists, with its metadata (symlinks followed).
fn first_existing(candidates: Vec<PathBuf>) -> Option<(PathBuf, Metadata)> {
    candidates
        .into_iter()
        .find_map(|candidate| fs::metadata(&candidate).ok().map(|meta| (candidate, meta)))
}

/// Synthetic and unclassified paths never take part in a rename.
fn renamable(class: PathClass<'_>) -> bool {
    !class.is_synthetic() && class != PathClass::Unclassified
}

fn check_writable(real: &Path) -> FsResult<()> {
    rustix::fs::access(real, rustix::fs::Access::WRITE_OK)
        .map_err(|_| FsError::permission_denied(display(real)))
}

impl VfsOps for OverlayFs {
    fn getattr(&self, path: &Path) -> FsResult<FileAttr> {
        let class = self.resolver.classify(path);
        if class.is_synthetic() {
            return Ok(FileAttr::directory(SYNTHETIC_DIR_PERM, self.created));
        }

        first_existing(self.resolver.candidates(class))
            .map(|(_, meta)| FileAttr::from_metadata(&meta))
            .ok_or_else(|| FsError::not_found(display(path)))
    }

    fn readdir(&self, path: &Path) -> FsResult<Vec<DirEntry>> {
        match self.resolver.classify(path) {
            PathClass::Root => Ok(overlay::list_root(&self.resolver)),
            PathClass::FirstPartyRoot => Ok(overlay::list_first_party_root(&self.resolver)),
            PathClass::Unclassified => Err(FsError::not_found(display(path))),
            PathClass::PassThrough(dir)
                if self.resolver.config().pass_through_root_of(dir).is_none() =>
            {
                overlay::list_pass_through_ancestor(&self.resolver, dir)
                    .ok_or_else(|| FsError::not_found(display(path)))
            }
            class => overlay::try_list_directory(&self.resolver.candidates(class))
                .ok_or_else(|| FsError::not_found(display(path))),
        }
    }

    fn open(&self, path: &Path, flags: OpenFlags) -> FsResult<OpenedFile> {
        let class = self.resolver.classify(path);
        if class.is_synthetic() {
            return Err(FsError::not_supported(display(path)));
        }

        let (real_path, _) = first_existing(self.resolver.open_candidates(class))
            .ok_or_else(|| FsError::not_found(display(path)))?;

        if flags.wants_write() {
            check_writable(&real_path)?;
        }

        debug!(path = %path.display(), real = %real_path.display(), write = flags.wants_write(), "open");
        let file = flags.options().open(&real_path)?;
        Ok(OpenedFile { file, real_path })
    }

    fn access(&self, _path: &Path, _mask: u32) -> FsResult<()> {
        Ok(())
    }

    fn statfs(&self) -> FsResult<StatFs> {
        let stat = rustix::fs::statvfs(self.workspace()).map_err(|e| FsError::Io(e.into()))?;

        Ok(StatFs {
            blocks: stat.f_blocks,
            bfree: stat.f_bfree,
            bavail: stat.f_bavail,
            files: stat.f_files,
            ffree: stat.f_ffree,
            bsize: stat.f_bsize as u32,
            namelen: stat.f_namemax as u32,
            frsize: stat.f_frsize as u32,
        })
    }

    fn create(&self, path: &Path, flags: OpenFlags, mode: u32) -> FsResult<OpenedFile> {
        let real_path = match self.resolver.classify(path) {
            PathClass::FirstPartyChild(rel) => self.workspace().join(rel),
            PathClass::FirstPartyRoot => return Err(FsError::already_exists(display(path))),
            _ => return Err(FsError::not_supported(display(path))),
        };

        debug!(path = %path.display(), real = %real_path.display(), mode = %format!("{mode:o}"), "create");

        let mut options = OpenOptions::new();
        options
            .read(flags.read)
            .write(true)
            .append(flags.append)
            .truncate(flags.truncate)
            .mode(mode);
        if flags.exclusive {
            options.create_new(true);
        } else {
            options.create(true);
        }

        let file = options.open(&real_path)?;
        Ok(OpenedFile { file, real_path })
    }

    fn mkdir(&self, path: &Path, mode: u32) -> FsResult<FileAttr> {
        let class = self.resolver.classify(path);
        if class.is_synthetic() {
            return Err(FsError::already_exists(display(path)));
        }

        let target = self.directory_target(class, path)?;
        debug!(path = %path.display(), real = %target.display(), "mkdir");

        fs::DirBuilder::new()
            .mode(mode)
            .recursive(true)
            .create(&target)?;

        let meta = fs::metadata(&target)?;
        Ok(FileAttr::from_metadata(&meta))
    }

    fn rmdir(&self, path: &Path) -> FsResult<()> {
        let class = self.resolver.classify(path);
        let target = self.directory_target(class, path)?;
        debug!(path = %path.display(), real = %target.display(), "rmdir");

        fs::remove_dir_all(&target)?;
        Ok(())
    }

    fn unlink(&self, path: &Path) -> FsResult<()> {
        let PathClass::FirstPartyChild(rel) = self.resolver.classify(path) else {
            return Err(FsError::not_supported(display(path)));
        };

        let target = self.workspace().join(rel);
        debug!(path = %path.display(), real = %target.display(), "unlink");
        fs::remove_file(&target)?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> FsResult<()> {
        let ws = self.workspace();
        let (source, dest) = match (self.resolver.classify(from), self.resolver.classify(to)) {
            (PathClass::FirstPartyChild(a), PathClass::FirstPartyChild(b)) => {
                (ws.join(a), ws.join(b))
            }
            (old, new) if !renamable(old) || !renamable(new) => {
                return Err(FsError::not_supported(display(from)));
            }
            // Any other pairing: both virtual paths are taken literally
            // under the vendor root that holds the old one.
            _ => {
                let old = from.strip_prefix("/").unwrap_or(from);
                let new = to.strip_prefix("/").unwrap_or(to);
                let (index, source) = self
                    .resolver
                    .vendor_candidates(old)
                    .find(|(_, candidate)| fs::symlink_metadata(candidate).is_ok())
                    .ok_or_else(|| FsError::not_supported(display(from)))?;
                let vendor = &self.resolver.config().vendor_roots()[index];
                (source, ws.join(vendor).join(new))
            }
        };

        debug!(from = %source.display(), to = %dest.display(), "rename");
        fs::rename(&source, &dest)?;
        Ok(())
    }

    fn truncate(&self, path: &Path, size: u64) -> FsResult<FileAttr> {
        let class = self.resolver.classify(path);
        if class.is_synthetic() {
            return Err(FsError::not_supported(display(path)));
        }

        let (real_path, _) = first_existing(self.resolver.candidates(class))
            .ok_or_else(|| FsError::not_found(display(path)))?;
        check_writable(&real_path)?;

        debug!(path = %path.display(), real = %real_path.display(), size, "truncate");
        let file = OpenOptions::new().write(true).open(&real_path)?;
        file.set_len(size)?;

        Ok(FileAttr::from_metadata(&file.metadata()?))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::os::unix::fs::PermissionsExt;

    use tempfile::TempDir;

    use super::*;

    struct Fixture {
        _tmp: TempDir,
        ws: PathBuf,
        fs: OverlayFs,
    }

    fn fixture_with(vendors: &[&str]) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let ws = tmp.path().to_path_buf();

        for dir in [
            "proj/pkg",
            "bazel-genfiles/proj/pkg",
            "bazel-genfiles/.vscode",
            "v1/golang.org/x/net",
            "v2/github.com/lib",
            "bazel-genfiles/v2/github.com/lib",
            ".vscode",
        ] {
            fs::create_dir_all(ws.join(dir)).unwrap();
        }
        fs::write(ws.join("proj/pkg/a.go"), b"package pkg\n").unwrap();
        fs::write(ws.join("bazel-genfiles/proj/pkg/a.pb.go"), b"package pkg\n").unwrap();
        fs::write(ws.join("bazel-genfiles/.vscode/settings.json"), b"{}").unwrap();
        fs::write(ws.join("v1/golang.org/x/net/net.go"), b"package net\n").unwrap();
        fs::write(ws.join("v2/github.com/lib/lib.go"), b"package lib\n").unwrap();
        fs::write(ws.join("bazel-genfiles/v2/github.com/lib/gen.go"), b"package lib\n").unwrap();

        let config = NamespaceConfig::builder("test.com", &ws)
            .vendor_roots(vendors.iter().copied())
            .pass_through_root(".vscode")
            .ignore_pattern("^bazel-")
            .build()
            .unwrap();

        Fixture {
            _tmp: tmp,
            ws,
            fs: OverlayFs::new(Arc::new(config)),
        }
    }

    fn fixture() -> Fixture {
        fixture_with(&["v1", "v2"])
    }

    #[test]
    fn test_synthetic_directories() {
        let f = fixture();
        for path in ["", "/", "test.com"] {
            let attr = f.fs.getattr(Path::new(path)).unwrap();
            assert!(attr.is_dir());
            assert_eq!(attr.perm, 0o755);
        }

        // Stable across calls.
        let first = f.fs.getattr(Path::new("test.com")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(f.fs.getattr(Path::new("test.com")).unwrap(), first);
        assert_eq!(f.fs.getattr(Path::new("")).unwrap().mtime, first.mtime);
    }

    #[test]
    fn test_getattr_precedence() {
        let f = fixture();
        let attr = f.fs.getattr(Path::new("test.com/proj/pkg/a.go")).unwrap();
        assert_eq!(attr.size, 12);

        let generated = f.fs.getattr(Path::new("test.com/proj/pkg/a.pb.go")).unwrap();
        assert!(generated.is_file());

        let vendor = f.fs.getattr(Path::new("golang.org/x/net/net.go")).unwrap();
        assert!(vendor.is_file());
        let vendor_generated = f.fs.getattr(Path::new("github.com/lib/gen.go")).unwrap();
        assert!(vendor_generated.is_file());
    }

    #[test]
    fn test_getattr_not_found() {
        let f = fixture();
        assert!(f.fs.getattr(Path::new("test.com/missing")).unwrap_err().is_not_found());
        assert!(f.fs.getattr(Path::new("nowhere/x")).unwrap_err().is_not_found());

        let bare = fixture_with(&[]);
        assert!(bare.fs.getattr(Path::new("golang.org/x/net")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_pass_through_never_falls_back_to_mirror() {
        let f = fixture();
        assert!(f.ws.join("bazel-genfiles/.vscode/settings.json").exists());
        let err = f.fs.getattr(Path::new(".vscode/settings.json")).unwrap_err();
        assert!(err.is_not_found());
        assert!(f.fs.open(Path::new(".vscode/settings.json"), OpenFlags::read()).is_err());
    }

    #[test]
    fn test_readdir_merges_sources() {
        let f = fixture();
        let entries = f.fs.readdir(Path::new("test.com/proj/pkg")).unwrap();
        let mut names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["a.go", "a.pb.go"]);

        let root = f.fs.readdir(Path::new("")).unwrap();
        assert!(root.contains(&DirEntry::directory("test.com")));
        assert!(root.contains(&DirEntry::directory("golang.org")));
        assert!(root.contains(&DirEntry::directory("github.com")));

        let first_party = f.fs.readdir(Path::new("test.com")).unwrap();
        assert_eq!(first_party, vec![DirEntry::directory("proj")]);

        assert!(f.fs.readdir(Path::new("test.com/nope")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_pass_through_ancestor_lists_only_the_way_down() {
        let tmp = TempDir::new().unwrap();
        let ws = tmp.path();
        for dir in ["tools/gopls", "tools/build", "v1/golang.org"] {
            fs::create_dir_all(ws.join(dir)).unwrap();
        }
        fs::write(ws.join("tools/README"), b"").unwrap();
        fs::write(ws.join("tools/gopls/gopls.go"), b"package main\n").unwrap();

        let config = NamespaceConfig::builder("test.com", ws)
            .vendor_root("v1")
            .pass_through_root("tools/gopls")
            .build()
            .unwrap();
        let overlay = OverlayFs::new(Arc::new(config));

        assert_eq!(
            overlay.readdir(Path::new("tools")).unwrap(),
            vec![DirEntry::directory("gopls")]
        );
        // Every listed name resolves; the others stay out of reach.
        assert!(overlay.getattr(Path::new("tools/gopls")).unwrap().is_dir());
        assert!(overlay.getattr(Path::new("tools/build")).unwrap_err().is_not_found());

        let inside = overlay.readdir(Path::new("tools/gopls")).unwrap();
        assert_eq!(inside, vec![DirEntry::file("gopls.go")]);
    }

    #[test]
    fn test_mkdir_routing() {
        let f = fixture();
        f.fs.mkdir(Path::new("test.com/newpkg"), 0o755).unwrap();
        assert!(f.ws.join("newpkg").is_dir());

        f.fs.mkdir(Path::new("other/newpkg"), 0o755).unwrap();
        assert!(f.ws.join("v1/other/newpkg").is_dir());
        assert!(!f.ws.join("v2/other").exists());

        assert!(matches!(
            f.fs.mkdir(Path::new("test.com"), 0o755),
            Err(FsError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_mkdir_without_vendor_roots() {
        let f = fixture_with(&[]);
        let err = f.fs.mkdir(Path::new("other/newpkg"), 0o755).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_rmdir_routing() {
        let f = fixture();
        fs::create_dir_all(f.ws.join("gone/deep")).unwrap();
        fs::write(f.ws.join("gone/deep/x.go"), b"").unwrap();
        f.fs.rmdir(Path::new("test.com/gone")).unwrap();
        assert!(!f.ws.join("gone").exists());

        f.fs.rmdir(Path::new("golang.org/x")).unwrap();
        assert!(!f.ws.join("v1/golang.org/x").exists());

        assert!(matches!(f.fs.rmdir(Path::new("test.com")), Err(FsError::NotSupported(_))));
        assert!(matches!(f.fs.rmdir(Path::new("")), Err(FsError::NotSupported(_))));
        assert!(f.ws.join("proj").is_dir());
    }

    #[test]
    fn test_pass_through_tree_is_never_restructured() {
        let f = fixture();
        fs::write(f.ws.join(".vscode/launch.json"), b"{}").unwrap();

        // Directory changes land in the first vendor root, not the real tree.
        assert!(f.fs.rmdir(Path::new(".vscode")).unwrap_err().is_not_found());
        assert!(f.ws.join(".vscode/launch.json").exists());

        f.fs.mkdir(Path::new(".vscode/newdir"), 0o755).unwrap();
        assert!(f.ws.join("v1/.vscode/newdir").is_dir());
        assert!(!f.ws.join(".vscode/newdir").exists());

        f.fs.rmdir(Path::new(".vscode/newdir")).unwrap();
        assert!(!f.ws.join("v1/.vscode/newdir").exists());
        assert!(f.ws.join(".vscode").is_dir());

        assert!(matches!(
            f.fs.rename(Path::new(".vscode/launch.json"), Path::new(".vscode/old.json")),
            Err(FsError::NotSupported(_))
        ));
        assert!(f.ws.join(".vscode/launch.json").exists());
        assert!(!f.ws.join(".vscode/old.json").exists());
    }

    #[test]
    fn test_create_and_unlink_first_party_only() {
        let f = fixture();
        let bare = fixture_with(&[]);
        for overlay in [&f.fs, &bare.fs] {
            assert!(matches!(
                overlay.create(Path::new("golang.org/x/new.go"), OpenFlags::write(), 0o644),
                Err(FsError::NotSupported(_))
            ));
            assert!(matches!(
                overlay.create(Path::new(".vscode/new.json"), OpenFlags::write(), 0o644),
                Err(FsError::NotSupported(_))
            ));
            assert!(matches!(
                overlay.unlink(Path::new("golang.org/x/net/net.go")),
                Err(FsError::NotSupported(_))
            ));
        }
        assert!(f.ws.join("v1/golang.org/x/net/net.go").exists());

        let mut opened = f
            .fs
            .create(Path::new("test.com/proj/pkg/b.go"), OpenFlags::write(), 0o644)
            .unwrap();
        opened.file.write_all(b"package pkg\n").unwrap();
        assert_eq!(opened.real_path, f.ws.join("proj/pkg/b.go"));
        assert_eq!(fs::read(f.ws.join("proj/pkg/b.go")).unwrap(), b"package pkg\n");

        let exclusive = OpenFlags {
            exclusive: true,
            ..OpenFlags::write()
        };
        assert!(f.fs.create(Path::new("test.com/proj/pkg/b.go"), exclusive, 0o644).is_err());

        f.fs.unlink(Path::new("test.com/proj/pkg/b.go")).unwrap();
        assert!(!f.ws.join("proj/pkg/b.go").exists());
    }

    #[test]
    fn test_open_reads_first_candidate() {
        let f = fixture();
        let mut opened = f.fs.open(Path::new("test.com/proj/pkg/a.go"), OpenFlags::read()).unwrap();
        let mut contents = String::new();
        opened.file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "package pkg\n");

        let generated = f
            .fs
            .open(Path::new("test.com/proj/pkg/a.pb.go"), OpenFlags::read())
            .unwrap();
        assert_eq!(generated.real_path, f.ws.join("bazel-genfiles/proj/pkg/a.pb.go"));
    }

    #[test]
    fn test_vendor_open_skips_generated_mirror() {
        let f = fixture();
        assert!(f.fs.getattr(Path::new("github.com/lib/gen.go")).is_ok());
        let err = f.fs.open(Path::new("github.com/lib/gen.go"), OpenFlags::read()).unwrap_err();
        assert!(err.is_not_found());

        let opened = f.fs.open(Path::new("github.com/lib/lib.go"), OpenFlags::read()).unwrap();
        assert_eq!(opened.real_path, f.ws.join("v2/github.com/lib/lib.go"));
    }

    #[test]
    fn test_open_for_write_checks_permission() {
        if rustix::process::geteuid().is_root() {
            // root passes every access check
            return;
        }

        let f = fixture();
        let real = f.ws.join("proj/pkg/a.go");
        fs::set_permissions(&real, fs::Permissions::from_mode(0o444)).unwrap();

        let err = f
            .fs
            .open(Path::new("test.com/proj/pkg/a.go"), OpenFlags::write())
            .unwrap_err();
        assert!(matches!(err, FsError::PermissionDenied(_)));
        assert_ne!(err.errno(), FsError::not_found("x").errno());

        assert!(f.fs.open(Path::new("test.com/proj/pkg/a.go"), OpenFlags::read()).is_ok());
    }

    #[test]
    fn test_rename_routing() {
        let f = fixture();
        f.fs
            .rename(Path::new("test.com/proj/pkg/a.go"), Path::new("test.com/proj/pkg/c.go"))
            .unwrap();
        assert!(f.ws.join("proj/pkg/c.go").exists());
        assert!(!f.ws.join("proj/pkg/a.go").exists());

        // found only in the second vendor root: renamed within it
        f.fs
            .rename(Path::new("github.com/lib/lib.go"), Path::new("github.com/lib/lib2.go"))
            .unwrap();
        assert!(f.ws.join("v2/github.com/lib/lib2.go").exists());
        assert!(!f.ws.join("v1/github.com").exists());

        assert!(matches!(
            f.fs.rename(Path::new("missing.go"), Path::new("other.go")),
            Err(FsError::NotSupported(_))
        ));
        assert!(matches!(
            f.fs.rename(Path::new("test.com/proj/pkg/c.go"), Path::new("github.com/lib/c.go")),
            Err(FsError::NotSupported(_))
        ));
        assert!(matches!(
            f.fs.rename(Path::new("github.com/lib/lib2.go"), Path::new("../escape.go")),
            Err(FsError::NotSupported(_))
        ));
        assert!(matches!(
            f.fs.rename(Path::new("test.com"), Path::new("github.com/x")),
            Err(FsError::NotSupported(_))
        ));

        // Mixed pairing: the vendor root holding the old path receives the
        // new path verbatim.
        fs::create_dir_all(f.ws.join("v2/.vscode")).unwrap();
        f.fs
            .rename(Path::new("github.com/lib/lib2.go"), Path::new(".vscode/lib.go"))
            .unwrap();
        assert!(f.ws.join("v2/.vscode/lib.go").exists());
        assert!(!f.ws.join(".vscode/lib.go").exists());
    }

    #[test]
    fn test_truncate() {
        let f = fixture();
        let attr = f.fs.truncate(Path::new("test.com/proj/pkg/a.go"), 3).unwrap();
        assert_eq!(attr.size, 3);
        assert_eq!(fs::read(f.ws.join("proj/pkg/a.go")).unwrap(), b"pac");
    }

    #[test]
    fn test_access_and_statfs() {
        let f = fixture();
        assert!(f.fs.access(Path::new("anything/at/all"), 2).is_ok());
        let stat = f.fs.statfs().unwrap();
        assert!(stat.bsize > 0);
    }

    #[test]
    fn test_concurrent_getattr() {
        let f = fixture();
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let fs = &f.fs;
                scope.spawn(move || {
                    for _ in 0..200 {
                        let path = if worker % 2 == 0 {
                            "test.com/proj/pkg/a.go"
                        } else {
                            "golang.org/x/net/net.go"
                        };
                        assert!(fs.getattr(Path::new(path)).unwrap().is_file());
                        assert!(fs.getattr(Path::new("test.com/missing")).is_err());
                    }
                });
            }
        });
    }
}
