use crate::context::Context;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::scan::error::{ErrorKind, Result as ScanResult};
use crate::scan::file::{FileReport, Prepared, expand_archive, sanitized};
use crate::scan::state::{ScanState, Visited};
use exn::ResultExt;
use rummage_extract::ContentType;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument;

/// Expand the archives sitting directly in the scan root, before the main
/// scan. Subdirectories are not looked at and other files are left untouched.
///
/// Archives handled here are marked visited in `state`, so passing the same
/// state on to [`scan`](super::scan) never expands them twice.
#[instrument(skip_all, fields(root = %ctx.scan_root().display(), expanded))]
pub async fn expand_first_level(ctx: Arc<Context>, state: &ScanState) -> LibraryResult<Vec<FileReport>> {
    let reports = expand_first_level_inner(ctx, state).await.or_raise(|| LibraryErrorKind::Scan)?;
    tracing::Span::current().record("expanded", reports.len());
    Ok(reports)
}

async fn expand_first_level_inner(ctx: Arc<Context>, state: &ScanState) -> ScanResult<Vec<FileReport>> {
    let mut entries = tokio::fs::read_dir(ctx.scan_root()).await.or_raise(|| ErrorKind::Enumerate)?;
    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await.or_raise(|| ErrorKind::Enumerate)? {
        if entry.file_type().await.is_ok_and(|file_type| file_type.is_file()) {
            candidates.push(entry.path());
        }
    }
    candidates.sort();

    let mut reports = Vec::new();
    for path in candidates {
        if ctx.cancellation().is_cancelled() {
            break;
        }
        let task_ctx = Arc::clone(&ctx);
        let visited = Arc::clone(state.visited());
        let report = tokio::task::spawn_blocking(move || expand_if_archive(&task_ctx, &visited, path))
            .await
            .or_raise(|| ErrorKind::Task)?;
        reports.extend(report);
    }
    Ok(reports)
}

fn expand_if_archive(ctx: &Context, visited: &Visited, path: PathBuf) -> Option<FileReport> {
    let classification = rummage_extract::classify(&path).ok()?;
    if classification.content_type != ContentType::Archive || !visited.insert(&path) {
        return None;
    }
    let path = sanitized(ctx, visited, path)?;
    let (report, expansion) = expand_archive(ctx, Prepared { path, classification });
    if let Some(expansion) = expansion {
        visited.forget(&expansion.members);
    }
    Some(report)
}
