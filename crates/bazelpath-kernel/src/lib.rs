//! # bazelpath-kernel
//!
//! Core of the bazelpath overlay: a single mounted directory that exposes a
//! Bazel workspace as an import-rooted source tree.
//!
//! - [`NamespaceConfig`] - Immutable description of the virtual prefix,
//!   workspace root, vendor roots, pass-through roots and ignore patterns
//! - [`vfs::PathResolver`] - Pure mapping from a virtual path to its real
//!   candidates, in precedence order
//! - [`vfs::OverlayFs`] - The filesystem-protocol adapter ([`vfs::VfsOps`])
//! - [`watch::ChangeWatcher`] - Turns file changes in the workspace into
//!   cache invalidations and rebuild requests
//!
//! The mounting layer (FUSE) and the build tool subprocesses live in
//! `bazelpath-server`; this crate only sees them through the
//! [`watch::Invalidator`] and [`exec::BuildExecutor`] traits.

pub mod config;
pub mod exec;
pub mod vfs;
pub mod watch;

pub use config::{ConfigError, NamespaceConfig, NamespaceConfigBuilder, GENERATED_MIRROR};
pub use exec::{BuildExecutor, ExecError, ExecResult};
pub use vfs::{
    DirEntry, FileAttr, FileType, FsError, FsResult, OpenFlags, OpenedFile, OverlayFs,
    PathClass, PathResolver, StatFs, VfsOps,
};
pub use watch::{ChangeEvent, ChangeKind, ChangeWatcher, DispatchPlan, Invalidator, WatchError, WatcherHandle};
