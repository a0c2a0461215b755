//! One extractor per supported format.
//!
//! Extractors never collect a document's text up front; they hand each
//! logical unit (line, cell, paragraph, page) to a [`FragmentScanner`] as soon
//! as it has been decoded.

pub(crate) mod doc;
pub(crate) mod docx;
pub(crate) mod pdf;
pub(crate) mod spreadsheet;
pub(crate) mod text;

use crate::ExtractionReport;
use crate::error::Result;
use crate::keywords::KeywordSet;
use crate::results::MatchSink;
use std::path::Path;

/// Runs every fragment of one document through the keyword set.
pub(crate) struct FragmentScanner<'a> {
    source: &'a Path,
    keywords: &'a KeywordSet,
    sink: &'a dyn MatchSink,
    report: ExtractionReport,
}
impl<'a> FragmentScanner<'a> {
    pub(crate) fn new(source: &'a Path, keywords: &'a KeywordSet, sink: &'a dyn MatchSink) -> Self {
        Self { source, keywords, sink, report: ExtractionReport::default() }
    }

    pub(crate) fn fragment(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        self.report.fragments += 1;
        self.report.matches += self.keywords.scan_fragment(text, self.source, self.sink)?;
        Ok(())
    }

    pub(crate) fn finish(self) -> ExtractionReport {
        self.report
    }
}
