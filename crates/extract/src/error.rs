//! Extraction Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use crate::ContentType;
use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for classification, extraction and keyword operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
///
/// ### Classification
/// - [`ErrorKind::Empty`]
/// - [`ErrorKind::Classification`]
///
/// ### Extraction
/// - [`ErrorKind::Io`]
/// - [`ErrorKind::Decode`]
/// - [`ErrorKind::Malformed`]
/// - [`ErrorKind::Encrypted`]
/// - [`ErrorKind::Unsupported`]
/// - [`ErrorKind::Panicked`]
///
/// ### Keywords
/// - [`ErrorKind::NoKeywords`]
/// - [`ErrorKind::InvalidKeyword`]
/// - [`ErrorKind::Record`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Zero-length files carry no signature to classify.
    #[display("file is empty")]
    Empty,
    /// The file header could not be read.
    #[display("could not read file header")]
    Classification,
    /// Reading the document failed part-way.
    #[display("I/O error")]
    Io,
    /// Text content is not valid UTF-8.
    #[display("text is not valid UTF-8")]
    Decode,
    /// The document structure is corrupt or uses an unsupported sub-format.
    #[display("malformed document: {_0}")]
    Malformed(#[error(not(source))] String),
    /// The document is encrypted; no attempt is made to read it.
    #[display("document is encrypted")]
    Encrypted,
    /// There is no extractor for this content type.
    #[display("no extractor for {_0}")]
    Unsupported(#[error(not(source))] ContentType),
    /// A third-party parser panicked.
    #[display("parser panicked: {_0}")]
    Panicked(#[error(not(source))] String),
    /// A keyword set must contain at least one keyword.
    #[display("no keywords to search for")]
    NoKeywords,
    /// A keyword is not a valid regular expression.
    #[display("invalid keyword pattern: {_0}")]
    InvalidKeyword(#[error(not(source))] String),
    /// A match could not be written to its result log.
    #[display("could not record match for keyword: {_0}")]
    Record(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Documents are either readable or they're not; only I/O is transient.
        matches!(self, Self::Io | Self::Classification | Self::Record(_))
    }
}
