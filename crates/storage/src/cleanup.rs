//! Removal of empty directories left behind after files have been moved out.

use crate::error::{ErrorKind, Result};
use crate::path::extended;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Repeatedly remove every empty directory under (and including) `root`
/// until a full pass finds nothing left to remove.
///
/// Directories at or underneath one of the `exclude` paths are never entered
/// or removed, and count as content for their parent. Returns the number of
/// directories removed. Stops at the first directory that cannot be read or
/// removed, so a stubborn directory cannot keep the loop spinning forever.
#[instrument(skip(exclude), fields(removed))]
pub fn remove_empty_dirs(root: &Path, exclude: &[PathBuf]) -> Result<usize> {
    let mut removed = 0;
    loop {
        let mut empty = Vec::new();
        if root.is_dir() && !is_excluded(root, exclude) {
            find_empty(root, exclude, &mut empty)?;
        }
        if empty.is_empty() {
            break;
        }
        for dir in empty {
            std::fs::remove_dir(extended(&dir)).map_err(|e| ErrorKind::from_io(e, &dir))?;
            tracing::trace!(dir = %dir.display(), "removed empty directory");
            removed += 1;
        }
    }
    tracing::Span::current().record("removed", removed);
    Ok(removed)
}

fn is_excluded(path: &Path, exclude: &[PathBuf]) -> bool {
    exclude.iter().any(|excluded| path.starts_with(excluded))
}

/// Collect `dir` (if it has no entries) or its empty descendants, in name order.
fn find_empty(dir: &Path, exclude: &[PathBuf], empty: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = std::fs::read_dir(extended(dir))
        .map_err(|e| ErrorKind::from_io(e, dir))?
        .map(|entry| entry.map_err(|e| ErrorKind::from_io(e, dir)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if entries.is_empty() {
        empty.push(dir.to_path_buf());
        return Ok(());
    }
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| ErrorKind::from_io(e, &path))?;
        if file_type.is_dir() && !is_excluded(&path, exclude) {
            find_empty(&path, exclude, empty)?;
        }
    }
    Ok(())
}
