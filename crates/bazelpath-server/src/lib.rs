//! bazelpath server library
//!
//! Mounts the virtual GOPATH overlay of a Bazel workspace over FUSE and
//! keeps the toolchain's package cache current while sources change.

pub mod bootstrap;
pub mod constants;
pub mod executor;
pub mod fuse;
pub mod mount;
pub mod settings;

pub use executor::BazelExecutor;
pub use fuse::{FuseInvalidator, FuseOps, InodeTable, OverlayFuse};
pub use mount::{MountError, MountedOverlay};
pub use settings::{BuildSettings, Settings, SettingsError};
