//! Filesystem protocol error types.

use std::io;
use thiserror::Error;

/// Protocol-level error returned by every [`VfsOps`](super::VfsOps)
/// operation.
///
/// Resolution never panics or leaks across the protocol boundary: the
/// mounting layer turns each variant into an OS error number with
/// [`FsError::errno`].
#[derive(Debug, Error)]
pub enum FsError {
    /// No real candidate exists for the virtual path.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation deliberately unimplemented for this class of path.
    #[error("operation not supported: {0}")]
    NotSupported(String),

    /// Explicit writability check failed.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Underlying syscall failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FsError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn not_supported(path: impl Into<String>) -> Self {
        Self::NotSupported(path.into())
    }

    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Returns true for [`FsError::NotFound`] and I/O errors of kind
    /// `NotFound`.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// OS error number for the mounting layer.
    #[cfg(unix)]
    pub fn errno(&self) -> i32 {
        use rustix::io::Errno;

        match self {
            Self::NotFound(_) => Errno::NOENT.raw_os_error(),
            Self::NotSupported(_) => Errno::NOSYS.raw_os_error(),
            Self::PermissionDenied(_) => Errno::ACCESS.raw_os_error(),
            Self::AlreadyExists(_) => Errno::EXIST.raw_os_error(),
            Self::Io(e) => e.raw_os_error().unwrap_or(Errno::IO.raw_os_error()),
        }
    }
}

/// Convert FsError to std::io::Error for compatibility.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            FsError::NotSupported(msg) => io::Error::new(io::ErrorKind::Unsupported, msg),
            FsError::PermissionDenied(msg) => io::Error::new(io::ErrorKind::PermissionDenied, msg),
            FsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            FsError::Io(e) => e,
        }
    }
}

/// Protocol result type.
pub type FsResult<T> = Result<T, FsError>;
