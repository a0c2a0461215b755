//! Staged, in-place expansion of tar archives.

use crate::Compression;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rummage_storage::{STAGING_PREFIX, move_file, unique_destination};
use std::fs::File;
use std::io::{BufReader, ErrorKind as IoErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Bytes needed to see both compression magic and a bare tar header.
const HEADER_LEN: u64 = 512;

/// The result of a successful [`expand`].
#[derive(Debug, Clone)]
pub struct Expansion {
    pub compression: Compression,
    /// Final paths of every regular-file member, in unpack order.
    pub members: Vec<PathBuf>,
}

/// Unpack `archive` into `destination`.
///
/// Members are first unpacked into a hidden staging directory inside
/// `destination`; only once the whole archive has been read are they moved
/// into place. Members never overwrite existing files: a colliding member gets
/// a timestamp suffix instead. If anything fails, the staging directory and
/// every member already placed are removed again.
#[instrument(skip_all, fields(archive = %archive.display(), compression, members))]
pub fn expand(archive: &Path, destination: &Path) -> Result<Expansion> {
    let mut file = File::open(archive).or_raise(|| ErrorKind::Io)?;
    let mut header = Vec::with_capacity(HEADER_LEN as usize);
    (&mut file).take(HEADER_LEN).read_to_end(&mut header).or_raise(|| ErrorKind::Io)?;
    file.seek(SeekFrom::Start(0)).or_raise(|| ErrorKind::Io)?;
    let compression = Compression::detect(&header, archive);
    tracing::Span::current().record("compression", tracing::field::display(compression));

    // Dropping the guard removes the staging directory and anything left in it.
    let staging = tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir_in(destination).or_raise(|| ErrorKind::Io)?;
    let reader = compression.wrap_reader(BufReader::new(file))?;
    let mut tar = tar::Archive::new(reader);
    tar.set_preserve_permissions(false);
    if let Err(e) = tar.unpack(staging.path()) {
        let kind = match e.kind() {
            IoErrorKind::InvalidData | IoErrorKind::UnexpectedEof => ErrorKind::InvalidData,
            _ => ErrorKind::Unpack,
        };
        return Err(e).or_raise(|| kind);
    }

    let mut staged = Vec::new();
    collect_files(staging.path(), &mut staged).or_raise(|| ErrorKind::Io)?;
    let mut members = Vec::with_capacity(staged.len());
    for source in staged {
        match place(staging.path(), &source, destination) {
            Ok(placed) => members.push(placed),
            Err(e) => {
                for placed in &members {
                    if let Err(e) = std::fs::remove_file(placed) {
                        tracing::warn!(path = %placed.display(), error = %e, "could not roll back expanded member");
                    }
                }
                return Err(e);
            },
        }
    }
    tracing::Span::current().record("members", members.len());
    tracing::debug!(destination = %destination.display(), "archive expanded");
    Ok(Expansion { compression, members })
}

fn place(staging: &Path, source: &Path, destination: &Path) -> Result<PathBuf> {
    let relative = source.strip_prefix(staging).or_raise(|| ErrorKind::Unpack)?;
    let target = destination.join(relative);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Io)?;
    }
    let target = unique_destination(&target);
    move_file(source, &target).or_raise(|| ErrorKind::Unpack)?;
    Ok(target)
}

/// Regular files only; links unpacked from the archive stay behind in staging.
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&entry.path(), files)?;
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    Ok(())
}
