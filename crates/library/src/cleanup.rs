use crate::audit::{AuditRecord, AuditSink, Operation};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::{Path, PathBuf};

/// Remove the empty directories left under `root` once its files have been
/// moved out, recording the outcome in the audit log. Nothing at or
/// underneath `exclude` is removed.
pub fn cleanup(root: &Path, exclude: &[PathBuf], audit: &dyn AuditSink) -> Result<usize> {
    let result = rummage_storage::remove_empty_dirs(root, exclude);
    match &result {
        Ok(removed) => {
            tracing::info!(root = %root.display(), removed, "removed empty directories");
            audit.record(AuditRecord::success(Operation::Cleanup, root));
        },
        Err(e) => audit.record(AuditRecord::failed(Operation::Cleanup, root, &**e)),
    }
    result.or_raise(|| ErrorKind::Cleanup)
}
