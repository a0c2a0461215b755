//! Word 97-2003 binary documents.
//!
//! Text lives in the `WordDocument` stream, scattered across pieces described
//! by the piece table (the `Pcdt` inside the `Clx` structure) in the table
//! stream. Each piece is either 8-bit (Windows-1252) or UTF-16LE.

use crate::error::{ErrorKind, Result};
use crate::formats::FragmentScanner;
use cfb::CompoundFile;
use exn::ResultExt;
use std::io::{Read, Seek};
use std::path::Path;

const WORD_IDENT: u16 = 0xA5EC;
const OFFSET_FLAGS: usize = 0x000A;
const OFFSET_FC_CLX: usize = 0x01A2;
const OFFSET_LCB_CLX: usize = 0x01A6;
const FLAG_ENCRYPTED: u16 = 0x0100;
const FLAG_WHICH_TABLE: u16 = 0x0200;
const CLXT_PRC: u8 = 0x01;
const CLXT_PCDT: u8 = 0x02;
const PCD_LEN: usize = 8;
const FC_COMPRESSED: u32 = 0x4000_0000;
const FC_MASK: u32 = 0x3FFF_FFFF;

/// Paragraphs end at carriage returns, table cell marks and page breaks.
const PARAGRAPH_MARKS: [char; 3] = ['\r', '\u{7}', '\u{c}'];

pub(crate) fn extract(path: &Path, scanner: &mut FragmentScanner<'_>) -> Result<()> {
    let mut file = cfb::open(path).map_err(|e| ErrorKind::Malformed(e.to_string()))?;
    let text = document_text(&mut file)?;
    for paragraph in text.split(PARAGRAPH_MARKS) {
        scanner.fragment(&clean(paragraph))?;
    }
    Ok(())
}

fn document_text<F: Read + Seek>(file: &mut CompoundFile<F>) -> Result<String> {
    let word = read_stream(file, "/WordDocument")?;
    if u16_at(&word, 0)? != WORD_IDENT {
        exn::bail!(ErrorKind::Malformed("not a Word binary document".to_string()));
    }
    let flags = u16_at(&word, OFFSET_FLAGS)?;
    if flags & FLAG_ENCRYPTED != 0 {
        exn::bail!(ErrorKind::Encrypted);
    }
    let table_name = if flags & FLAG_WHICH_TABLE != 0 { "/1Table" } else { "/0Table" };
    let table = read_stream(file, table_name)?;
    let fc_clx = u32_at(&word, OFFSET_FC_CLX)? as usize;
    let lcb_clx = u32_at(&word, OFFSET_LCB_CLX)? as usize;
    let clx = table
        .get(fc_clx..fc_clx.saturating_add(lcb_clx))
        .ok_or_else(|| exn::Exn::from(malformed("piece table out of bounds")))?;
    let pieces = piece_table(clx)?;

    let mut text = String::new();
    for piece in pieces {
        text.push_str(&piece.decode(&word)?);
    }
    Ok(text)
}

fn read_stream<F: Read + Seek>(file: &mut CompoundFile<F>, name: &str) -> Result<Vec<u8>> {
    let mut stream = file.open_stream(name).map_err(|_| malformed(&format!("missing {name} stream")))?;
    let mut data = Vec::new();
    stream.read_to_end(&mut data).or_raise(|| ErrorKind::Io)?;
    Ok(data)
}

#[derive(Debug, PartialEq, Eq)]
struct Piece {
    chars: usize,
    offset: usize,
    compressed: bool,
}
impl Piece {
    fn decode(&self, word: &[u8]) -> Result<String> {
        let len = if self.compressed { self.chars } else { self.chars * 2 };
        let bytes = word
            .get(self.offset..self.offset.saturating_add(len))
            .ok_or_else(|| exn::Exn::from(malformed("text piece out of bounds")))?;
        if self.compressed {
            return Ok(bytes.iter().map(|&b| cp1252(b)).collect());
        }
        let units: Vec<u16> = bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect();
        Ok(String::from_utf16_lossy(&units))
    }
}

/// Skip any `Prc` entries, then split the `PlcPcd` into pieces.
fn piece_table(clx: &[u8]) -> Result<Vec<Piece>> {
    let mut pos = 0;
    while clx.get(pos) == Some(&CLXT_PRC) {
        let size = i16::from_le_bytes([byte_at(clx, pos + 1)?, byte_at(clx, pos + 2)?]);
        pos += 3 + usize::try_from(size).map_err(|_| malformed("negative property size"))?;
    }
    if clx.get(pos) != Some(&CLXT_PCDT) {
        exn::bail!(malformed("piece table descriptor missing"));
    }
    let lcb = u32_at(clx, pos + 1)? as usize;
    let plc = clx.get(pos + 5..pos + 5 + lcb).ok_or_else(|| exn::Exn::from(malformed("piece table truncated")))?;
    if lcb < 4 || (lcb - 4) % (4 + PCD_LEN) != 0 {
        exn::bail!(malformed("piece table has unexpected size"));
    }
    let count = (lcb - 4) / (4 + PCD_LEN);
    let descriptors = (count + 1) * 4;
    (0..count)
        .map(|i| {
            let start = u32_at(plc, i * 4)?;
            let end = u32_at(plc, (i + 1) * 4)?;
            let fc = u32_at(plc, descriptors + i * PCD_LEN + 2)?;
            let chars = end.checked_sub(start).ok_or_else(|| exn::Exn::from(malformed("pieces out of order")))?;
            let compressed = fc & FC_COMPRESSED != 0;
            let raw = (fc & FC_MASK) as usize;
            Ok(Piece { chars: chars as usize, offset: if compressed { raw / 2 } else { raw }, compressed })
        })
        .collect()
}

/// Drop field markers and other control characters, keeping tabs.
fn clean(paragraph: &str) -> String {
    paragraph.chars().filter(|c| *c == '\t' || !c.is_control()).collect()
}

fn cp1252(byte: u8) -> char {
    const HIGH: [char; 32] = [
        '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}', '\u{02C6}',
        '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}', '\u{017D}', '\u{FFFD}', '\u{FFFD}', '\u{2018}',
        '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}', '\u{2122}', '\u{0161}',
        '\u{203A}', '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
    ];
    match byte {
        0x80..=0x9F => HIGH[(byte - 0x80) as usize],
        _ => byte as char,
    }
}

fn malformed(reason: &str) -> ErrorKind {
    ErrorKind::Malformed(reason.to_string())
}

fn byte_at(data: &[u8], at: usize) -> Result<u8> {
    data.get(at).copied().ok_or_else(|| exn::Exn::from(malformed("unexpected end of structure")))
}

fn u16_at(data: &[u8], at: usize) -> Result<u16> {
    Ok(u16::from_le_bytes([byte_at(data, at)?, byte_at(data, at + 1)?]))
}

fn u32_at(data: &[u8], at: usize) -> Result<u32> {
    let bytes = data.get(at..at + 4).ok_or_else(|| exn::Exn::from(malformed("unexpected end of structure")))?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
