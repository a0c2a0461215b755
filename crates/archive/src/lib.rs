//! Detection and in-place expansion of (optionally compressed) tar archives.
//!
//! - **Detection** from magic bytes ([`Compression::from_magic_bytes`],
//!   [`is_tar`]) or file names ([`Compression::from_path`],
//!   [`has_archive_name`]).
//! - **Expansion** via [`expand`], which unpacks into a hidden staging
//!   directory and only moves members into place once the whole archive has
//!   been read.
//!
//! Bzip2 and Gzip are always available. XZ and Zstd are behind feature flags.

mod detect;
pub mod error;
mod expand;
mod ops;

pub use crate::detect::{TAR_MAGIC, TAR_MAGIC_OFFSET, has_archive_name, is_tar, looks_like_archive};
pub use crate::expand::{Expansion, expand};

/// A supported compression wrapper around a tar stream.
///
/// Variants gated behind feature flags (`xz`, `zstd`) are only available when
/// the corresponding feature is enabled. Defaults to [`None`](Self::None)
/// (a bare tar).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Compression {
    /// Uncompressed
    #[default]
    #[display("none")]
    None,
    /// Bzip2 compression (.bz2)
    #[display("bzip2")]
    Bzip2,
    /// Gzip compression (.gz, .tgz)
    #[display("gzip")]
    Gzip,
    /// XZ/LZMA compression (.xz)
    #[cfg(feature = "xz")]
    #[display("xz")]
    Xz,
    /// Zstd compression (.zst)
    #[cfg(feature = "zstd")]
    #[display("zstd")]
    Zstd,
}

#[cfg(test)]
mod tests {
    use crate::Compression;

    #[test]
    fn compression_default() {
        assert_eq!(Compression::default(), Compression::None);
        assert_eq!(Compression::Gzip.to_string(), "gzip");
    }
}
