use crate::error::{ErrorKind, Result};
use crate::formats::FragmentScanner;
use exn::ResultExt;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind as IoErrorKind, Read};
use std::path::Path;

/// Line by line, as UTF-8, or as UTF-16 when the file opens with a byte order
/// mark. One undecodable line fails the whole file.
pub(crate) fn extract(path: &Path, scanner: &mut FragmentScanner<'_>) -> Result<()> {
    let mut reader = BufReader::new(File::open(path).or_raise(|| ErrorKind::Io)?);
    let little_endian = match reader.fill_buf().or_raise(|| ErrorKind::Io)? {
        [0xFF, 0xFE, ..] => Some(true),
        [0xFE, 0xFF, ..] => Some(false),
        _ => None,
    };
    if let Some(little_endian) = little_endian {
        for line in decode_utf16(reader, little_endian)?.lines() {
            scanner.fragment(line)?;
        }
        return Ok(());
    }
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == IoErrorKind::InvalidData => return Err(e).or_raise(|| ErrorKind::Decode),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io),
        };
        scanner.fragment(&line)?;
    }
    Ok(())
}

/// The whole file, byte order mark dropped.
fn decode_utf16(mut reader: impl Read, little_endian: bool) -> Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).or_raise(|| ErrorKind::Io)?;
    if bytes.len() % 2 != 0 {
        exn::bail!(ErrorKind::Decode);
    }
    let units = bytes.chunks_exact(2).skip(1).map(|pair| match little_endian {
        true => u16::from_le_bytes([pair[0], pair[1]]),
        false => u16::from_be_bytes([pair[0], pair[1]]),
    });
    char::decode_utf16(units).collect::<std::result::Result<String, _>>().or_raise(|| ErrorKind::Decode)
}
