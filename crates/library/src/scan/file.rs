use crate::audit::{AuditRecord, Operation};
use crate::context::Context;
use crate::scan::state::Visited;
use rummage_archive::Expansion;
use rummage_extract::{Classification, ContentType, ExtractionReport};
use rummage_storage::{Destination, Sanitized};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// What was done with a file before it was organized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Handling {
    /// Text was extracted and matched against the keywords.
    Extracted(ExtractionReport),
    /// The archive was unpacked next to itself; its members are handled on a
    /// later pass.
    Expanded { members: usize },
    /// Extraction or expansion failed.
    Failed(String),
    /// No extractor for this type, or the file could not be classified.
    Unsupported(Option<String>),
}
impl Handling {
    /// The destination tree this handling sends the file to.
    pub fn destination(&self) -> Destination {
        match self {
            Self::Extracted(_) | Self::Expanded { .. } => Destination::Processed,
            Self::Failed(_) => Destination::Error,
            Self::Unsupported(_) => Destination::Unsupported,
        }
    }
}

/// Where a file was sent, and whether it got there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrganizeOutcome {
    pub destination: Destination,
    /// Final path; `None` if the move failed and the file is still in place.
    pub moved_to: Option<PathBuf>,
}
impl OrganizeOutcome {
    pub fn is_success(&self) -> bool {
        self.moved_to.is_some()
    }
}

/// The result of handling a single file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileReport {
    /// Path the file was handled under (after sanitizing).
    pub path: PathBuf,
    /// `None` when the file could not be classified.
    pub classification: Option<Classification>,
    pub handling: Handling,
    pub organized: OrganizeOutcome,
}
impl FileReport {
    pub fn content_type(&self) -> Option<ContentType> {
        self.classification.as_ref().map(|classification| classification.content_type)
    }

    /// Extraction or expansion failed, or the file could not be moved.
    pub fn is_failure(&self) -> bool {
        matches!(self.handling, Handling::Failed(_)) || !self.organized.is_success()
    }
}

/// An archive that has been sanitized and classified but not yet expanded.
#[derive(Debug)]
pub(crate) struct Prepared {
    pub(crate) path: PathBuf,
    pub(crate) classification: Classification,
}

#[derive(Debug)]
pub(crate) enum Triage {
    /// Gone before it could be handled, or already handled under its sanitized name.
    Skipped,
    Done(FileReport),
    /// Expansion has to wait until nothing else is in flight.
    Archive(Prepared),
}

/// Handle one file from start to finish, expanding it if it is an archive.
///
/// Returns `None` if the file no longer exists.
pub fn handle_file(ctx: &Context, path: &Path) -> Option<FileReport> {
    match triage(ctx, &Visited::default(), path.to_path_buf()) {
        Triage::Skipped => None,
        Triage::Done(report) => Some(report),
        Triage::Archive(prepared) => Some(expand_archive(ctx, prepared).0),
    }
}

/// Sanitize and classify `path`, then extract and organize it, unless it
/// turns out to be an archive.
#[instrument(level = "debug", skip_all, fields(path = %path.display(), content_type))]
pub(crate) fn triage(ctx: &Context, visited: &Visited, path: PathBuf) -> Triage {
    if !path.is_file() {
        tracing::debug!("file vanished before it could be handled");
        return Triage::Skipped;
    }
    let Some(path) = sanitized(ctx, visited, path) else {
        return Triage::Skipped;
    };

    let classification = match rummage_extract::classify(&path) {
        Ok(classification) => {
            ctx.audit(AuditRecord::success(Operation::Classify, &path));
            classification
        },
        Err(e) => {
            let reason = (*e).to_string();
            tracing::debug!(error = ?e, "classification failed; treating as unsupported");
            ctx.audit(AuditRecord::failed(Operation::Classify, &path, &reason));
            return Triage::Done(finish(ctx, path, None, Handling::Unsupported(Some(reason))));
        },
    };
    let content_type = classification.content_type;
    tracing::Span::current().record("content_type", tracing::field::display(content_type));

    if content_type == ContentType::Archive {
        return Triage::Archive(Prepared { path, classification });
    }
    if !content_type.is_extractable() {
        return Triage::Done(finish(ctx, path, Some(classification), Handling::Unsupported(None)));
    }
    let handling = match rummage_extract::extract(&path, content_type, ctx.keywords(), ctx.sink(), ctx.options()) {
        Ok(report) => {
            ctx.audit(AuditRecord::success(Operation::Extract, &path));
            Handling::Extracted(report)
        },
        Err(e) => {
            let reason = (*e).to_string();
            tracing::warn!(path = %path.display(), error = ?e, "extraction failed");
            ctx.audit(AuditRecord::failed(Operation::Extract, &path, &reason));
            Handling::Failed(reason)
        },
    };
    Triage::Done(finish(ctx, path, Some(classification), handling))
}

/// Unpack an archive into the scan root, wherever the archive was found, and
/// organize the archive itself.
#[instrument(level = "debug", skip_all, fields(path = %prepared.path.display()))]
pub(crate) fn expand_archive(ctx: &Context, prepared: Prepared) -> (FileReport, Option<Expansion>) {
    let Prepared { path, classification } = prepared;
    match rummage_archive::expand(&path, ctx.scan_root()) {
        Ok(expansion) => {
            tracing::info!(archive = %path.display(), members = expansion.members.len(), "archive expanded");
            ctx.audit(AuditRecord::success(Operation::Expand, &path));
            let handling = Handling::Expanded { members: expansion.members.len() };
            (finish(ctx, path, Some(classification), handling), Some(expansion))
        },
        Err(e) => {
            let reason = (*e).to_string();
            tracing::warn!(archive = %path.display(), error = ?e, "archive expansion failed");
            ctx.audit(AuditRecord::failed(Operation::Expand, &path, &reason));
            (finish(ctx, path, Some(classification), Handling::Failed(reason)), None)
        },
    }
}

/// Sanitize `path` and adopt its new name. `None` if the new name belongs to
/// a file that has already been handled.
pub(crate) fn sanitized(ctx: &Context, visited: &Visited, path: PathBuf) -> Option<PathBuf> {
    match rummage_storage::sanitize(&path) {
        Ok(Sanitized::Unchanged) => Some(path),
        Ok(Sanitized::Renamed(renamed) | Sanitized::Converged(renamed)) => {
            ctx.audit(AuditRecord::success(Operation::Sanitize, &path));
            visited.insert(&renamed).then_some(renamed)
        },
        Err(e) => {
            tracing::debug!(path = %path.display(), error = ?e, "keeping original name");
            ctx.audit(AuditRecord::failed(Operation::Sanitize, &path, &*e));
            Some(path)
        },
    }
}

fn finish(ctx: &Context, path: PathBuf, classification: Option<Classification>, handling: Handling) -> FileReport {
    let destination = handling.destination();
    let moved_to = match ctx.organizer().organize(&path, destination) {
        Ok(moved_to) => {
            ctx.audit(AuditRecord::success(Operation::Organize, &path));
            Some(moved_to)
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), %destination, error = ?e, "could not organize file");
            ctx.audit(AuditRecord::failed(Operation::Organize, &path, &*e));
            None
        },
    };
    FileReport { path, classification, handling, organized: OrganizeOutcome { destination, moved_to } }
}
