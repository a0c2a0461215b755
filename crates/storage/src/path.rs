//! Path validation and platform helpers.
//!
//! Every path the organizer recreates under a destination root goes through
//! [`relative_to`], which refuses anything that would land outside of it.

use crate::error::{ErrorKind, Result};
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

/// Length (in characters) beyond which Windows refuses ordinary paths.
pub const MAX_PATH: usize = 260;

/// Normalizes a relative path, ensuring that it never escapes its root (no
/// `..` traversal past the start) and contains no null bytes.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use rummage_storage::validate_path;
/// assert!(validate_path("finance/2024/report.xlsx").is_ok());
/// assert!(validate_path("a/../report.xlsx").is_ok());
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(validate_path("a/./b//c.txt/").unwrap(), Path::new("a/b/c.txt"));
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but
                // truncate in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir => {},
            Component::RootDir | Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Path of `path` relative to `root`, validated so that joining it onto
/// another root can never escape that root.
pub fn relative_to(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<PathBuf> {
    let (root, path) = (root.as_ref(), path.as_ref());
    let relative = path
        .strip_prefix(root)
        .map_err(|_| exn::Exn::from(ErrorKind::OutsideRoot(path.to_path_buf(), root.to_path_buf())))?;
    validate(relative)
}

/// Apply the extended-length (`\\?\`) prefix to long absolute paths on Windows.
/// Every other platform gets the path back untouched.
pub fn extended(path: &Path) -> Cow<'_, Path> {
    #[cfg(windows)]
    {
        let raw = path.as_os_str();
        if raw.len() > MAX_PATH && path.is_absolute() && !raw.to_string_lossy().starts_with(r"\\?\") {
            let mut prefixed = std::ffi::OsString::from(r"\\?\");
            prefixed.push(raw);
            return Cow::Owned(PathBuf::from(prefixed));
        }
    }
    Cow::Borrowed(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("finance/report.xlsx", "finance/report.xlsx")]
    #[case("a//b//c", "a/b/c")]
    #[case("a/./b/./c", "a/b/c")]
    #[case("a/b/..", "a")]
    #[case("report.csv/", "report.csv")]
    fn valid_paths_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case("a/../../b")]
    #[case("..")]
    #[case("")]
    #[case(".")]
    #[case("/absolute")]
    #[case("a\0b")]
    fn invalid_paths_rejected(#[case] input: &str) {
        assert!(validate(input).is_err());
    }

    #[test]
    fn relative_to_strips_root() {
        let rel = relative_to("/scan", "/scan/finance/q1.xlsx").unwrap();
        assert_eq!(rel, Path::new("finance/q1.xlsx"));
    }

    #[test]
    fn relative_to_rejects_foreign_path() {
        let err = relative_to("/scan", "/elsewhere/q1.xlsx").unwrap_err();
        assert!(matches!(&*err, ErrorKind::OutsideRoot(..)));
        assert!(relative_to("/scan", "/scan").is_err());
    }

    #[cfg(not(windows))]
    #[test]
    fn extended_is_noop_off_windows() {
        let long = PathBuf::from(format!("/{}", "x".repeat(MAX_PATH + 10)));
        assert!(matches!(extended(&long), Cow::Borrowed(_)));
    }
}
