//! Content classification, text extraction and keyword matching.
//!
//! A file is [classified](classify) from its header bytes, then handed to
//! [`extract`], which streams its text fragment by fragment through a
//! [`KeywordSet`] and records every match in a [`MatchSink`].

pub mod classify;
pub mod error;
mod formats;
pub mod keywords;
pub mod results;

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use tracing::instrument;

pub use crate::classify::{Classification, ContentType, HEADER_LEN, classify, classify_header};
use crate::error::{ErrorKind, Result};
use crate::formats::FragmentScanner;
pub use crate::keywords::{Keyword, KeywordMode, KeywordSet};
pub use crate::results::{MatchRecord, MatchSink, MemorySink, ResultLog};

/// Rows read from each sheet of a modern workbook unless configured otherwise.
pub const DEFAULT_ROW_LIMIT: usize = 10_000;

/// What one extraction saw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Non-blank fragments tested against the keyword set.
    pub fragments: usize,
    /// Keyword matches recorded (one per keyword per fragment).
    pub matches: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Rows per sheet for modern spreadsheets, counted from the top of the
    /// sheet. Sheets are streamed, so rows past the limit are never loaded.
    /// Legacy workbooks are read whole.
    pub row_limit: usize,
}
impl Default for ExtractOptions {
    fn default() -> Self {
        Self { row_limit: DEFAULT_ROW_LIMIT }
    }
}

/// Extract the text of `path` as `content_type` and test every fragment
/// against `keywords`.
///
/// Matches are recorded as they are found, so a failure part-way through a
/// document leaves the matches before it in `sink`. Panics inside the format
/// parsers are caught and reported as [`ErrorKind::Panicked`].
#[instrument(level = "debug", skip(keywords, sink, options), fields(fragments, matches))]
pub fn extract(
    path: &Path,
    content_type: ContentType,
    keywords: &KeywordSet,
    sink: &dyn MatchSink,
    options: ExtractOptions,
) -> Result<ExtractionReport> {
    if !content_type.is_extractable() {
        exn::bail!(ErrorKind::Unsupported(content_type));
    }
    let mut scanner = FragmentScanner::new(path, keywords, sink);
    let outcome = catch_unwind(AssertUnwindSafe(|| match content_type {
        ContentType::PlainText => formats::text::extract(path, &mut scanner),
        ContentType::LegacySpreadsheet => formats::spreadsheet::extract_legacy(path, &mut scanner),
        ContentType::ModernSpreadsheet => formats::spreadsheet::extract_modern(path, options.row_limit, &mut scanner),
        ContentType::LegacyDocument => formats::doc::extract(path, &mut scanner),
        ContentType::ModernDocument => formats::docx::extract(path, &mut scanner),
        ContentType::PdfDocument => formats::pdf::extract(path, &mut scanner),
        ContentType::Archive | ContentType::Unsupported => Err(ErrorKind::Unsupported(content_type).into()),
    }));
    match outcome {
        Ok(result) => result?,
        Err(payload) => exn::bail!(ErrorKind::Panicked(panic_message(payload.as_ref()))),
    }
    let report = scanner.finish();
    let span = tracing::Span::current();
    span.record("fragments", report.fragments);
    span.record("matches", report.matches);
    Ok(report)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
