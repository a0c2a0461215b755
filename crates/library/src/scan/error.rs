//! Error types for the [`scan`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};

/// A scan error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a scan failure.
///
/// Only [`ErrorKind::Enumerate`] ends a scan; the others are reported and the
/// scan carries on with the next file.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The scan root itself could not be listed.
    #[display("could not enumerate scan root")]
    Enumerate,
    /// A directory underneath the scan root could not be listed.
    #[display("could not list directory")]
    Walk,
    /// A file-handling task panicked or was aborted; the file stays where it was.
    #[display("file handling task did not complete")]
    Task,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Enumerate | Self::Walk)
    }
}
