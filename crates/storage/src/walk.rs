//! Lazy, depth-first enumeration of regular files under a directory.

use crate::error::{ErrorKind, Result};
use async_stream::stream;
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs::{self, DirEntry, ReadDir};

/// Directories whose name starts with this prefix hold half-unpacked archives
/// and are never enumerated.
pub const STAGING_PREFIX: &str = ".rummage-staging-";

/// A lazily-evaluated sequence of absolute file paths.
pub type PathStream = Pin<Box<dyn Stream<Item = Result<PathBuf>> + Send>>;

enum WalkEntry {
    File(PathBuf),
    Descend(PathBuf),
    Skip,
}

/// Start walking `root`, skipping symlinks, staging directories and anything
/// at or underneath one of the `exclude` paths.
///
/// Failing to open `root` itself is returned immediately. Failures further
/// down are yielded from the stream and the walk carries on.
pub async fn walk(root: impl Into<PathBuf>, exclude: Vec<PathBuf>) -> Result<PathStream> {
    let root = root.into();
    let first = fs::read_dir(&root).await.map_err(|e| ErrorKind::from_io(e, &root))?;

    Ok(Box::pin(stream! {
        let mut first = Some(first);
        let mut stack: Vec<PathBuf> = Vec::new();
        'dirs: loop {
            let mut entries = match first.take() {
                Some(entries) => entries,
                None => match stack.pop() {
                    None => break 'dirs,
                    Some(current) => match read_dir(&current).await {
                        Ok(Some(entries)) => entries,
                        // Removed since it was queued; nothing to list.
                        Ok(None) => continue 'dirs,
                        Err(e) => {
                            yield Err(e);
                            continue 'dirs;
                        },
                    },
                },
            };

            'entries: loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break 'entries,
                    Err(e) => {
                        yield Err(exn::Exn::from(ErrorKind::Io(e)));
                        continue 'dirs;
                    },
                };
                match classify(entry, &exclude).await {
                    Ok(WalkEntry::File(path)) => yield Ok(path),
                    Ok(WalkEntry::Descend(dir)) => stack.push(dir),
                    Ok(WalkEntry::Skip) => {},
                    Err(e) => yield Err(e),
                }
            }
        }
    }))
}

async fn read_dir(dir: &Path) -> Result<Option<ReadDir>> {
    match fs::read_dir(dir).await {
        Ok(entries) => Ok(Some(entries)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(exn::Exn::from(ErrorKind::from_io(e, dir))),
    }
}

async fn classify(entry: DirEntry, exclude: &[PathBuf]) -> Result<WalkEntry> {
    let path = entry.path();
    if exclude.iter().any(|excluded| path.starts_with(excluded)) {
        return Ok(WalkEntry::Skip);
    }
    let file_type = entry.file_type().await.map_err(|e| ErrorKind::from_io(e, &path))?;
    if file_type.is_dir() {
        if entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
            return Ok(WalkEntry::Skip);
        }
        return Ok(WalkEntry::Descend(path));
    }
    if file_type.is_file() {
        return Ok(WalkEntry::File(path));
    }
    // Symlinks, sockets, devices.
    Ok(WalkEntry::Skip)
}
