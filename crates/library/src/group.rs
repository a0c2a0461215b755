//! Sorting files into one folder per extension.

use crate::audit::{AuditRecord, AuditSink, Operation};
use crate::error::{ErrorKind, Result};
use crate::layout::nested_in;
use exn::ResultExt;
use futures::StreamExt;
use rummage_storage::{DestinationRoots, Organizer, safe_name, walk};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Folder for files without an extension.
pub const NO_EXTENSION: &str = "none";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Grouped {
    pub moved: usize,
    pub failed: usize,
}

/// Folder name for `path`: its lower-cased, sanitized extension.
pub fn extension_dir(path: &Path) -> String {
    let extension = path.extension().map(|ext| ext.to_string_lossy().to_lowercase()).unwrap_or_default();
    match safe_name(&extension) {
        name if name.is_empty() => NO_EXTENSION.to_string(),
        name => name.into_owned(),
    }
}

/// Move every file under `root` to `<grouped>/<extension>/<name>`, skipping
/// anything at or underneath `exclude` (and `grouped` itself). Name
/// collisions get a timestamp suffix. A file that cannot be moved is audited
/// and left where it was.
#[instrument(skip(exclude, audit), fields(moved, failed))]
pub async fn group_by_extension(
    root: &Path,
    grouped: &Path,
    mut exclude: Vec<PathBuf>,
    audit: Arc<dyn AuditSink>,
) -> Result<Grouped> {
    exclude.extend(nested_in(root, grouped));
    let mut paths = walk(root, exclude).await.or_raise(|| ErrorKind::Group)?;
    let mut files = Vec::new();
    while let Some(path) = paths.next().await {
        match path {
            Ok(path) => files.push(path),
            Err(e) => tracing::warn!(error = ?e, "skipping unreadable directory"),
        }
    }

    let organizer = Organizer::new(root, DestinationRoots::under(grouped));
    let grouped = grouped.to_path_buf();
    let summary = tokio::task::spawn_blocking(move || move_all(&organizer, &grouped, files, audit.as_ref()))
        .await
        .or_raise(|| ErrorKind::Group)?;
    let span = tracing::Span::current();
    span.record("moved", summary.moved);
    span.record("failed", summary.failed);
    Ok(summary)
}

fn move_all(organizer: &Organizer, grouped: &Path, files: Vec<PathBuf>, audit: &dyn AuditSink) -> Grouped {
    let mut summary = Grouped::default();
    for path in files {
        let directory = grouped.join(extension_dir(&path));
        match organizer.move_into(&path, &directory) {
            Ok(_) => {
                summary.moved += 1;
                audit.record(AuditRecord::success(Operation::Group, &path));
            },
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(path = %path.display(), error = ?e, "could not group file");
                audit.record(AuditRecord::failed(Operation::Group, &path, &*e));
            },
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAudit;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    #[rstest]
    #[case("report.PDF", "pdf")]
    #[case("archive.tar.gz", "gz")]
    #[case("README", "none")]
    #[case(".hidden", "none")]
    #[case("odd.t x t", "txt")]
    fn extension_dirs(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(extension_dir(Path::new(name)), expected);
    }

    #[tokio::test]
    async fn groups_by_extension_with_collisions() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("in");
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::write(root.join("a/report.csv"), "one").unwrap();
        fs::write(root.join("b/report.csv"), "two").unwrap();
        fs::write(root.join("Makefile"), "all:").unwrap();
        let grouped = root.join("grouped");
        let audit = Arc::new(MemoryAudit::default());

        let summary = group_by_extension(&root, &grouped, Vec::new(), audit.clone()).await.unwrap();
        assert_eq!(summary, Grouped { moved: 3, failed: 0 });
        let csvs: Vec<_> = fs::read_dir(grouped.join("csv")).unwrap().collect();
        assert_eq!(csvs.len(), 2);
        assert!(grouped.join("none/Makefile").is_file());
        assert_eq!(audit.of(Operation::Group).len(), 3);
    }

    #[tokio::test]
    async fn nested_output_is_not_grouped() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("in");
        let output = root.join("out");
        fs::create_dir_all(output.join("results")).unwrap();
        fs::write(output.join("log.txt"), "audit").unwrap();
        fs::write(output.join("results/budget.txt"), "match").unwrap();
        fs::write(root.join("a.txt"), "plain").unwrap();
        let grouped = output.join("grouped");

        let summary = group_by_extension(&root, &grouped, vec![output.clone()], Arc::new(MemoryAudit::default()))
            .await
            .unwrap();
        assert_eq!(summary, Grouped { moved: 1, failed: 0 });
        assert!(grouped.join("txt/a.txt").is_file());
        assert!(output.join("log.txt").is_file());
        assert!(output.join("results/budget.txt").is_file());
        assert_eq!(fs::read_dir(grouped.join("txt")).unwrap().count(), 1);
    }
}
