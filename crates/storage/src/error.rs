//! Storage Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::path::{Path, PathBuf};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File or directory does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// File already exists (for operations that require new files)
    #[display("file already exists: {}", _0.display())]
    AlreadyExists(#[error(not(source))] PathBuf),
    /// Source and destination are on different devices and the fallback copy failed
    #[display("cross-device move failed: {}", _0.display())]
    CrossDevice(#[error(not(source))] PathBuf),
    /// Path has no usable file name, or contains invalid characters
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Path is not located underneath the root it was expected in
    #[display("path `{}` is outside of root `{}`", _0.display(), _1.display())]
    OutsideRoot(#[error(not(source))] PathBuf, #[error(not(source))] PathBuf),
    /// Nothing of the file name survives sanitizing
    #[display("file name cannot be sanitized: {}", _0.display())]
    Unsanitizable(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Map an I/O error to the most specific kind for the path it occurred on.
    pub fn from_io(err: IoError, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        match err.kind() {
            IoErrorKind::NotFound => Self::NotFound(path),
            IoErrorKind::PermissionDenied => Self::PermissionDenied(path),
            IoErrorKind::AlreadyExists => Self::AlreadyExists(path),
            IoErrorKind::CrossesDevices => Self::CrossDevice(path),
            _ => Self::Io(err),
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
