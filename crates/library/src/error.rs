//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Per-file failures never show up here: the scan loop turns them into
//! [`FileReport`](crate::scan::FileReport)s and audit records instead.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which workflow step could not go ahead.
///
/// ### Setup
/// - [`ErrorKind::Layout`]
/// - [`ErrorKind::Audit`]
///
/// ### Workflows
/// - [`ErrorKind::Scan`]
/// - [`ErrorKind::Stats`]
/// - [`ErrorKind::Group`]
/// - [`ErrorKind::Cleanup`]
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The output directory skeleton could not be created.
    #[display("could not create output layout")]
    Layout,
    /// The audit log could not be opened.
    #[display("could not open audit log")]
    Audit,
    /// The scan loop reported an error; see the error tree for details.
    #[display("scan failed")]
    Scan,
    /// File-type statistics could not be gathered or written.
    #[display("could not produce file statistics")]
    Stats,
    /// Files could not be enumerated for grouping.
    #[display("could not group files")]
    Group,
    /// Removing empty directories stopped part-way.
    #[display("directory cleanup failed")]
    Cleanup,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Stats | Self::Group | Self::Cleanup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Layout.to_string(), "could not create output layout");
        assert_eq!(ErrorKind::Cleanup.to_string(), "directory cleanup failed");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Cleanup.is_retryable());
        assert!(!ErrorKind::Layout.is_retryable());
        assert!(!ErrorKind::Scan.is_retryable());
    }
}
