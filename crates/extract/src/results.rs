//! Where keyword matches go.
//!
//! Every match becomes one line, `<source path>---<fragment>`, appended to the
//! result log named after the keyword. Line breaks inside a fragment are
//! folded into spaces so a record never spans lines.

use crate::error::{ErrorKind, Result};
use crate::keywords::{Keyword, KeywordSet};
use exn::{OptionExt, ResultExt};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Receives every keyword match found during extraction.
pub trait MatchSink: Send + Sync {
    fn record(&self, keyword: &Keyword, source: &Path, fragment: &str) -> Result<()>;
}

/// A single keyword match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchRecord {
    pub keyword: String,
    pub source: PathBuf,
    pub fragment: String,
}
impl MatchRecord {
    /// The line written to the keyword's result log, newline included.
    pub fn line(&self) -> String {
        format_line(&self.source, &self.fragment)
    }
}

fn format_line(source: &Path, fragment: &str) -> String {
    let folded: String = fragment.chars().map(|c| if matches!(c, '\r' | '\n') { ' ' } else { c }).collect();
    format!("{}---{}\n", source.display(), folded)
}

/// Append-only, per-keyword result files under a results directory.
///
/// Each append opens the file in append mode and writes the whole line with a
/// single call while holding that keyword's lock, so concurrent extractions
/// never interleave partial lines.
#[derive(Debug)]
pub struct ResultLog {
    dir: PathBuf,
    locks: HashMap<String, Mutex<()>>,
}
impl ResultLog {
    pub fn new(dir: impl Into<PathBuf>, keywords: &KeywordSet) -> Self {
        let locks = keywords.iter().map(|keyword| (keyword.file_name().to_string(), Mutex::new(()))).collect();
        Self { dir: dir.into(), locks }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, keyword: &Keyword) -> PathBuf {
        self.dir.join(keyword.file_name())
    }
}
impl MatchSink for ResultLog {
    fn record(&self, keyword: &Keyword, source: &Path, fragment: &str) -> Result<()> {
        let lock = self
            .locks
            .get(keyword.file_name())
            .ok_or_raise(|| ErrorKind::Record(keyword.text().to_string()))?;
        let line = format_line(source, fragment);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(keyword))
            .or_raise(|| ErrorKind::Record(keyword.text().to_string()))?;
        file.write_all(line.as_bytes()).or_raise(|| ErrorKind::Record(keyword.text().to_string()))
    }
}

/// Keeps matches in memory, in the order they were recorded.
#[derive(Debug, Default)]
pub struct MemorySink(Mutex<Vec<MatchRecord>>);
impl MemorySink {
    pub fn records(&self) -> Vec<MatchRecord> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
impl MatchSink for MemorySink {
    fn record(&self, keyword: &Keyword, source: &Path, fragment: &str) -> Result<()> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(MatchRecord {
            keyword: keyword.text().to_string(),
            source: source.to_path_buf(),
            fragment: fragment.to_string(),
        });
        Ok(())
    }
}
