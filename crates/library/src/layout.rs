//! The output directory skeleton.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rummage_storage::{Destination, DestinationRoots};
use std::path::{Path, PathBuf};
use tracing::instrument;

pub const RESULTS_DIR: &str = "results";
pub const GROUPED_DIR: &str = "grouped";
pub const AUDIT_LOG_FILE: &str = "log.txt";
pub const STATS_FILE: &str = "stats.json";

/// Where everything a run produces ends up.
///
/// ```text
/// <root>/
///   processed/   error/   unsupported/   results/
///   log.txt      stats.json
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}
impl Layout {
    /// Paths only; nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the output root and its subdirectories. Existing directories
    /// (and their contents) are left alone.
    #[instrument(level = "debug", skip_all, fields(root = %root.as_ref().display()))]
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let layout = Self::new(absolute(root.as_ref()));
        let dirs = Destination::ALL.iter().map(|destination| layout.destination(*destination)).chain([layout.results()]);
        for dir in dirs {
            std::fs::create_dir_all(&dir).or_raise(|| ErrorKind::Layout)?;
        }
        Ok(layout)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn destination(&self, destination: Destination) -> PathBuf {
        self.root.join(destination.dir_name())
    }

    pub fn destinations(&self) -> DestinationRoots {
        DestinationRoots::under(&self.root)
    }

    pub fn results(&self) -> PathBuf {
        self.root.join(RESULTS_DIR)
    }

    pub fn grouped(&self) -> PathBuf {
        self.root.join(GROUPED_DIR)
    }

    pub fn audit_log(&self) -> PathBuf {
        self.root.join(AUDIT_LOG_FILE)
    }

    pub fn stats(&self) -> PathBuf {
        self.root.join(STATS_FILE)
    }
}

/// Canonical when the path exists, otherwise made absolute lexically.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// `inner` if it lies underneath `root`, for excluding the output tree from
/// enumeration of the scan root.
pub(crate) fn nested_in(root: &Path, inner: &Path) -> Vec<PathBuf> {
    if inner.starts_with(root) && inner != root { vec![inner.to_path_buf()] } else { Vec::new() }
}
