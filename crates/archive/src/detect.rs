use crate::Compression;
use std::path::Path;

/// Leading bytes of each compressed stream format. bzip2 is matched by
/// [`is_bzip2`].
const SIGNATURES: &[(&[u8], Compression)] = &[
    (&[0x1F, 0x8B], Compression::Gzip),
    #[cfg(feature = "xz")]
    (&[0xFD, b'7', b'z', b'X', b'Z', 0x00], Compression::Xz),
    #[cfg(feature = "zstd")]
    (&[0x28, 0xB5, 0x2F, 0xFD], Compression::Zstd),
];

/// `BZh` followed by the block size digit. Plain text starting with `BZh` is
/// not bzip2.
fn is_bzip2(header: &[u8]) -> bool {
    matches!(header, [b'B', b'Z', b'h', b'1'..=b'9', ..])
}

/// POSIX (`ustar\0`) and GNU (`ustar `) tar headers both carry this at
/// [`TAR_MAGIC_OFFSET`].
pub const TAR_MAGIC: &[u8; 5] = b"ustar";
pub const TAR_MAGIC_OFFSET: usize = 257;

/// Archive file name endings and the compression each implies.
const ARCHIVE_SUFFIXES: &[(&str, Compression)] = &[
    (".tar", Compression::None),
    (".tar.gz", Compression::Gzip),
    (".tgz", Compression::Gzip),
    (".tar.bz2", Compression::Bzip2),
    (".tbz2", Compression::Bzip2),
    #[cfg(feature = "xz")]
    (".tar.xz", Compression::Xz),
    #[cfg(feature = "xz")]
    (".txz", Compression::Xz),
    #[cfg(feature = "zstd")]
    (".tar.zst", Compression::Zstd),
    #[cfg(feature = "zstd")]
    (".tzst", Compression::Zstd),
];

/// Lower-cased file name and the archive suffix it ends in, if any. A name
/// that is nothing but the suffix (`.tar`) is a dotfile, not an archive.
fn archive_suffix(path: &Path) -> Option<Compression> {
    let name = path.file_name()?.to_string_lossy().to_lowercase();
    ARCHIVE_SUFFIXES
        .iter()
        .find(|(suffix, _)| name.len() > suffix.len() && name.ends_with(suffix))
        .map(|(_, compression)| *compression)
}

impl From<&[u8]> for Compression {
    fn from(header: &[u8]) -> Self {
        Self::from_magic_bytes(header)
    }
}
impl Compression {
    /// The compression an archive's file name promises: `bundle.tgz` is gzip,
    /// `bundle.tar` and `notes.txt` are [`None`](Self::None).
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        archive_suffix(path.as_ref()).unwrap_or_default()
    }

    /// The compressed stream format `header` starts with, or
    /// [`None`](Self::None) when it matches no known signature.
    #[must_use]
    pub fn from_magic_bytes(header: &[u8]) -> Self {
        if is_bzip2(header) {
            return Compression::Bzip2;
        }
        SIGNATURES
            .iter()
            .find(|(signature, _)| header.starts_with(signature))
            .map(|(_, compression)| *compression)
            .unwrap_or_default()
    }

    /// Magic bytes first; the file name only decides when the content is silent.
    #[must_use]
    pub fn detect(header: &[u8], path: impl AsRef<Path>) -> Self {
        match Self::from_magic_bytes(header) {
            Compression::None => Self::from_path(path),
            detected => detected,
        }
    }
}

/// Whether `header` (the first 512 bytes or more of a file) is an
/// uncompressed tar header.
#[must_use]
pub fn is_tar(header: &[u8]) -> bool {
    header.get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len()) == Some(TAR_MAGIC.as_slice())
}

/// Whether the file name ends in one of the well-known tar archive suffixes.
#[must_use]
pub fn has_archive_name(path: impl AsRef<Path>) -> bool {
    archive_suffix(path.as_ref()).is_some()
}

/// Content signature OR file name: either is enough to try expanding a file.
#[must_use]
pub fn looks_like_archive(header: &[u8], path: impl AsRef<Path>) -> bool {
    Compression::from_magic_bytes(header) != Compression::None || is_tar(header) || has_archive_name(path)
}
