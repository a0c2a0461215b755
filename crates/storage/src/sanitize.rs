//! File name sanitizing.
//!
//! Names are reduced to word characters, dots, dashes and underscores, and
//! must start with a word character other than an underscore. Anything that
//! reads the file afterwards (parsers, archive tools, the organizer) can then
//! rely on a boring name.

use crate::error::{ErrorKind, Result};
use crate::path::extended;
use exn::OptionExt;
use regex::Regex;
use std::borrow::Cow;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::instrument;

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w.\-]").unwrap());
static DISALLOWED_LEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\W_]+").unwrap());

/// What [`sanitize`] did to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sanitized {
    /// The name was already safe; nothing on disk changed.
    Unchanged,
    /// The file was renamed to the contained path.
    Renamed(PathBuf),
    /// A file with the safe name already existed, so the original was deleted
    /// as a stale duplicate and the contained (pre-existing) path is adopted.
    Converged(PathBuf),
}
impl Sanitized {
    /// The path the file should be referred to from now on.
    pub fn path<'a>(&'a self, original: &'a Path) -> &'a Path {
        match self {
            Self::Unchanged => original,
            Self::Renamed(path) | Self::Converged(path) => path,
        }
    }
}

/// Compute the safe form of a file name. Borrows when nothing needs to change.
///
/// ```
/// use rummage_storage::sanitize::safe_name;
/// assert_eq!(safe_name("report (final).csv"), "reportfinal.csv");
/// assert_eq!(safe_name("_draft.txt"), "draft.txt");
/// assert_eq!(safe_name("plain.txt"), "plain.txt");
/// ```
pub fn safe_name(name: &str) -> Cow<'_, str> {
    match DISALLOWED.replace_all(name, "") {
        Cow::Borrowed(kept) => match DISALLOWED_LEADING.find(kept) {
            Some(leading) => Cow::Borrowed(&name[leading.end()..]),
            None => Cow::Borrowed(name),
        },
        Cow::Owned(kept) => Cow::Owned(DISALLOWED_LEADING.replace(&kept, "").into_owned()),
    }
}

/// Rename `path` on disk so that its file name is safe.
///
/// If a file with the safe name already exists, the original is treated as a
/// stale copy: it is removed and the existing file is adopted. A name that has
/// nothing safe left in it fails with [`ErrorKind::Unsanitizable`].
#[instrument(level = "debug", fields(renamed))]
pub fn sanitize(path: &Path) -> Result<Sanitized> {
    let original = path
        .file_name()
        .ok_or_raise(|| ErrorKind::InvalidPath(path.to_path_buf()))?
        .to_string_lossy();
    let safe = safe_name(&original);
    if safe == original {
        return Ok(Sanitized::Unchanged);
    }
    if safe.is_empty() {
        exn::bail!(ErrorKind::Unsanitizable(path.to_path_buf()));
    }
    let target = path.with_file_name(safe.as_ref());
    tracing::Span::current().record("renamed", tracing::field::display(target.display()));

    // `rename` silently replaces an existing target on Unix, so check first.
    if target.exists() {
        std::fs::remove_file(extended(path)).map_err(|e| ErrorKind::from_io(e, path))?;
        tracing::debug!(target = %target.display(), "safe name already taken; removed stale original");
        return Ok(Sanitized::Converged(target));
    }
    match std::fs::rename(extended(path), extended(&target)) {
        Ok(()) => Ok(Sanitized::Renamed(target)),
        Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
            std::fs::remove_file(extended(path)).map_err(|e| ErrorKind::from_io(e, path))?;
            Ok(Sanitized::Converged(target))
        },
        Err(e) => Err(exn::Exn::from(ErrorKind::from_io(e, path))),
    }
}
