//! Moving files into their terminal destination trees.
//!
//! A file keeps its path relative to the scan root, recreated under one of the
//! three destination roots. When the destination is taken, the incoming file
//! gets a `_<unix-millis>` suffix; the existing one is never overwritten.

use crate::error::{ErrorKind, Result};
use crate::path::{extended, relative_to};
use derive_more::Display;
use std::collections::HashMap;
use std::ffi::OsString;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use time::UtcDateTime;
use tracing::instrument;

/// The terminal destination category for a file.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Extracted (or expanded) successfully.
    #[display("processed")]
    Processed,
    /// A supported format that failed to extract.
    #[display("error")]
    Error,
    /// A format that is not (or could not be) classified as supported.
    #[display("unsupported")]
    Unsupported,
}
impl Destination {
    pub const ALL: [Self; 3] = [Self::Processed, Self::Error, Self::Unsupported];

    /// Directory name of this destination underneath the output root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Error => "error",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Absolute roots for each [`Destination`].
#[derive(Clone, Debug)]
pub struct DestinationRoots {
    pub processed: PathBuf,
    pub error: PathBuf,
    pub unsupported: PathBuf,
}
impl DestinationRoots {
    /// Roots laid out as `processed/`, `error/` and `unsupported/` under `output`.
    pub fn under(output: impl AsRef<Path>) -> Self {
        let output = output.as_ref();
        Self {
            processed: output.join(Destination::Processed.dir_name()),
            error: output.join(Destination::Error.dir_name()),
            unsupported: output.join(Destination::Unsupported.dir_name()),
        }
    }

    pub fn get(&self, destination: Destination) -> &Path {
        match destination {
            Destination::Processed => &self.processed,
            Destination::Error => &self.error,
            Destination::Unsupported => &self.unsupported,
        }
    }
}

/// Moves files out of the scan root into their destination trees.
///
/// Collision suffixes are chosen while holding a lock for the destination
/// directory, so two files racing for the same name in the same directory
/// cannot both pick it.
#[derive(Debug)]
pub struct Organizer {
    scan_root: PathBuf,
    roots: DestinationRoots,
    locks: DirectoryLocks,
}
impl Organizer {
    pub fn new(scan_root: impl Into<PathBuf>, roots: DestinationRoots) -> Self {
        Self { scan_root: scan_root.into(), roots, locks: DirectoryLocks::default() }
    }

    pub fn scan_root(&self) -> &Path {
        &self.scan_root
    }

    pub fn roots(&self) -> &DestinationRoots {
        &self.roots
    }

    /// Move `path` (somewhere under the scan root) into `destination`,
    /// preserving its relative directory structure. Returns the final path.
    #[instrument(level = "debug", skip(self), fields(to))]
    pub fn organize(&self, path: &Path, destination: Destination) -> Result<PathBuf> {
        let relative = relative_to(&self.scan_root, path)?;
        let target = self.roots.get(destination).join(relative);
        let final_path = self.place(path, &target)?;
        tracing::Span::current().record("to", tracing::field::display(final_path.display()));
        Ok(final_path)
    }

    /// Move `path` into `directory` under its own file name, suffixing on
    /// collision. Used where the relative structure is not preserved (grouping).
    pub fn move_into(&self, path: &Path, directory: &Path) -> Result<PathBuf> {
        let name = path.file_name().ok_or_else(|| exn::Exn::from(ErrorKind::InvalidPath(path.to_path_buf())))?;
        self.place(path, &directory.join(name))
    }

    fn place(&self, from: &Path, target: &Path) -> Result<PathBuf> {
        let parent = target.parent().ok_or_else(|| exn::Exn::from(ErrorKind::InvalidPath(target.to_path_buf())))?;
        std::fs::create_dir_all(extended(parent)).map_err(|e| ErrorKind::from_io(e, parent))?;
        let lock = self.locks.for_directory(parent);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let target = unique_destination(target);
        move_file(from, &target)?;
        Ok(target)
    }
}

#[derive(Debug, Default)]
struct DirectoryLocks(Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>);
impl DirectoryLocks {
    fn for_directory(&self, dir: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(dir.to_path_buf()).or_default().clone()
    }
}

/// Return `target` if it is free, otherwise the first free variant of it with
/// a `_<unix-millis>` suffix inserted before the extension.
pub fn unique_destination(target: &Path) -> PathBuf {
    if !target.exists() {
        return target.to_path_buf();
    }
    let mut millis = UtcDateTime::now().unix_timestamp_nanos() / 1_000_000;
    loop {
        let candidate = with_suffix(target, millis);
        if !candidate.exists() {
            return candidate;
        }
        millis += 1;
    }
}

fn with_suffix(target: &Path, millis: i128) -> PathBuf {
    let mut name = OsString::new();
    match (target.file_stem(), target.extension()) {
        (Some(stem), Some(ext)) => {
            name.push(stem);
            name.push(format!("_{millis}."));
            name.push(ext);
        },
        (Some(stem), None) => {
            name.push(stem);
            name.push(format!("_{millis}"));
        },
        _ => name.push(format!("_{millis}")),
    }
    target.with_file_name(name)
}

/// Rename `from` to `to`, falling back to copy-then-remove across devices.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    match std::fs::rename(extended(from), extended(to)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == IoErrorKind::CrossesDevices => {
            tracing::debug!(from = %from.display(), to = %to.display(), "cross-device move; copying instead");
            copy_across(from, to)
        },
        Err(e) => Err(exn::Exn::from(ErrorKind::from_io(e, from))),
    }
}

/// Copy then delete the source. Either way exactly one copy is left behind.
fn copy_across(from: &Path, to: &Path) -> Result<()> {
    if let Err(e) = std::fs::copy(extended(from), extended(to)) {
        tracing::warn!(from = %from.display(), to = %to.display(), error = %e, "copy failed; removing partial file");
        discard(to);
        exn::bail!(ErrorKind::CrossDevice(to.to_path_buf()));
    }
    if let Err(e) = std::fs::remove_file(extended(from)) {
        discard(to);
        exn::bail!(ErrorKind::from_io(e, from));
    }
    Ok(())
}

fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(extended(path))
        && e.kind() != IoErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "could not remove partial copy");
    }
}
