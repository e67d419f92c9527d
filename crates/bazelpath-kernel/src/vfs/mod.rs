//! Virtual namespace overlay.
//!
//! Key components:
//!
//! - [`PathResolver`] - Classifies a virtual path and produces its real
//!   candidates in precedence order (no I/O)
//! - [`overlay::list_directory`] - Merges the listings of several real
//!   directories under the documented merge policy
//! - [`VfsOps`] - The filesystem-protocol surface
//! - [`OverlayFs`] - [`VfsOps`] on top of the resolver and the overlay
//!
//! ## Design Decisions
//!
//! - **Path-based, no inodes**: Operations use virtual paths relative to
//!   the mount root. The FUSE binding owns inode numbering.
//! - **Classify once**: Every operation matches exhaustively on a single
//!   [`PathClass`] instead of re-deriving routing from string prefixes.
//! - **Blocking I/O**: Operations are synchronous; the mounting layer runs
//!   each request on its own blocking worker, so independent paths proceed
//!   in parallel without shared mutable state.

mod error;
mod ops;
pub mod overlay;
mod overlay_fs;
mod resolver;
mod types;

pub use error::{FsError, FsResult};
pub use ops::VfsOps;
pub use overlay_fs::OverlayFs;
pub use resolver::{PathClass, PathResolver};
pub use types::{DirEntry, FileAttr, FileType, OpenFlags, OpenedFile, StatFs};
