//! The immutable keyword set searched for in every fragment.

use crate::error::{Error, ErrorKind, Result};
use crate::results::MatchSink;
use derive_more::Display;
use exn::ResultExt;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

/// How keyword text is turned into a pattern.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(rename_all = "lowercase"))]
pub enum KeywordMode {
    /// Keywords match as plain, case-insensitive substrings.
    #[default]
    #[display("literal")]
    Literal,
    /// Keywords are case-insensitive regular expressions.
    #[display("regex")]
    Regex,
}
impl FromStr for KeywordMode {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "literal" => Ok(Self::Literal),
            "regex" => Ok(Self::Regex),
            _ => exn::bail!(ErrorKind::InvalidKeyword(format!("unknown keyword mode `{s}`"))),
        }
    }
}

/// A single keyword with its compiled matcher and result-log file name.
#[derive(Clone, Debug)]
pub struct Keyword {
    text: String,
    pattern: Regex,
    file_name: String,
}
impl Keyword {
    fn new(text: &str, mode: KeywordMode) -> Result<Self> {
        let source = match mode {
            KeywordMode::Literal => regex::escape(text),
            KeywordMode::Regex => text.to_string(),
        };
        let pattern = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .or_raise(|| ErrorKind::InvalidKeyword(text.to_string()))?;
        Ok(Self { text: text.to_string(), pattern, file_name: file_name_for(text) })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// `<keyword>.txt`, with path separators and NUL replaced by `_`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn is_match(&self, fragment: &str) -> bool {
        self.pattern.is_match(fragment)
    }
}

fn file_name_for(text: &str) -> String {
    let stem: String = text.chars().map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c }).collect();
    format!("{stem}.txt")
}

/// A non-empty, duplicate-free set of keywords. Immutable once built.
#[derive(Clone, Debug)]
pub struct KeywordSet {
    keywords: Vec<Keyword>,
    mode: KeywordMode,
}
impl KeywordSet {
    /// Build a set from raw lines: surrounding whitespace is trimmed, blank
    /// lines are skipped and duplicates collapse (first occurrence wins).
    pub fn new<I, S>(lines: I, mode: KeywordMode) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut keywords = Vec::new();
        for line in lines {
            let text = line.as_ref().trim();
            if text.is_empty() || !seen.insert(text.to_string()) {
                continue;
            }
            keywords.push(Keyword::new(text, mode)?);
        }
        if keywords.is_empty() {
            exn::bail!(ErrorKind::NoKeywords);
        }
        Ok(Self { keywords, mode })
    }

    /// Load a newline-delimited keyword file.
    #[instrument(fields(count))]
    pub fn load(path: &Path, mode: KeywordMode) -> Result<Self> {
        let contents = std::fs::read_to_string(path).or_raise(|| ErrorKind::Io)?;
        let set = Self::new(contents.lines(), mode)?;
        tracing::Span::current().record("count", set.len());
        Ok(set)
    }

    pub fn mode(&self) -> KeywordMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    /// Always `false`; construction rejects empty sets.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyword> {
        self.keywords.iter()
    }

    /// Test every keyword against `fragment`, recording each match from
    /// `source` in `sink`. Returns the number of keywords that matched.
    pub fn scan_fragment(&self, fragment: &str, source: &Path, sink: &dyn MatchSink) -> Result<usize> {
        let mut matched = 0;
        for keyword in self.keywords.iter().filter(|keyword| keyword.is_match(fragment)) {
            sink.record(keyword, source, fragment)?;
            matched += 1;
        }
        Ok(matched)
    }
}
impl<'a> IntoIterator for &'a KeywordSet {
    type Item = &'a Keyword;
    type IntoIter = std::slice::Iter<'a, Keyword>;
    fn into_iter(self) -> Self::IntoIter {
        self.keywords.iter()
    }
}
