//! Append-only audit trail of everything the workflows did to each file.
//!
//! Every record is one line:
//!
//! ```text
//! [organize Success]/scan/notes.txt
//! [extract Failed]/scan/report.pdf --- document is encrypted
//! ```
//!
//! Components never hold a global log; they report through whichever
//! [`AuditSink`] they were handed.

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Operation {
    #[display("sanitize")]
    Sanitize,
    #[display("classify")]
    Classify,
    #[display("extract")]
    Extract,
    #[display("expand")]
    Expand,
    #[display("organize")]
    Organize,
    #[display("cleanup")]
    Cleanup,
    #[display("group")]
    Group,
    #[display("stats")]
    Stats,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditRecord {
    pub operation: Operation,
    pub outcome: Outcome,
    pub subject: PathBuf,
    pub detail: Option<String>,
}
impl AuditRecord {
    pub fn success(operation: Operation, subject: impl Into<PathBuf>) -> Self {
        Self { operation, outcome: Outcome::Success, subject: subject.into(), detail: None }
    }

    /// A failure; line breaks in `detail` are folded so the record stays on one line.
    pub fn failed(operation: Operation, subject: impl Into<PathBuf>, detail: impl fmt::Display) -> Self {
        let detail = detail.to_string().replace(['\r', '\n'], " ");
        Self { operation, outcome: Outcome::Failed, subject: subject.into(), detail: Some(detail) }
    }

    /// Success or failure depending on `result`.
    pub fn from_result<T, E: fmt::Display>(
        operation: Operation,
        subject: impl Into<PathBuf>,
        result: &std::result::Result<T, E>,
    ) -> Self {
        match result {
            Ok(_) => Self::success(operation, subject),
            Err(e) => Self::failed(operation, subject, e),
        }
    }
}
impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}]{}", self.operation, self.outcome, self.subject.display())?;
        if let Some(detail) = &self.detail {
            write!(f, " --- {detail}")?;
        }
        Ok(())
    }
}

/// Destination for audit records.
///
/// Recording never fails from the caller's point of view: an audit trail that
/// cannot be written must not stop files from being sorted.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// The `log.txt` audit file. One locked write per record.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    file: Mutex<File>,
}
impl AuditLog {
    /// Open (or create) `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path).or_raise(|| ErrorKind::Audit)?;
        Ok(Self { path, file: Mutex::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
impl AuditSink for AuditLog {
    fn record(&self, record: AuditRecord) {
        let line = format!("{record}\n");
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = file.write_all(line.as_bytes()) {
            tracing::warn!(path = %self.path.display(), error = %e, record = %record, "could not write audit record");
        }
    }
}

/// Keeps records in memory, in the order they arrived.
#[derive(Debug, Default)]
pub struct MemoryAudit(Mutex<Vec<AuditRecord>>);
impl MemoryAudit {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Records for one operation.
    pub fn of(&self, operation: Operation) -> Vec<AuditRecord> {
        self.records().into_iter().filter(|record| record.operation == operation).collect()
    }
}
impl AuditSink for MemoryAudit {
    fn record(&self, record: AuditRecord) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(record);
    }
}
