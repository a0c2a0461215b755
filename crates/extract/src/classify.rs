//! Content-based file type classification.
//!
//! Only the first [`HEADER_LEN`] bytes are inspected. The file name is
//! consulted in exactly two places: generic OLE2 compound files (where the
//! container alone cannot tell a workbook from a document) and archive names,
//! which are ORed into the archive decision.

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use memchr::memmem;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::instrument;

/// Number of leading bytes read for classification.
pub const HEADER_LEN: usize = 8 * 1024;

const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const OLE_MIME: &str = "application/x-ole-storage";
const TEXT_MIME: &str = "text/plain";
const UNKNOWN_MIME: &str = "application/octet-stream";

/// The closed set of content types the scan loop dispatches on.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum ContentType {
    #[display("plain text")]
    PlainText,
    #[display("legacy spreadsheet")]
    LegacySpreadsheet,
    #[display("modern spreadsheet")]
    ModernSpreadsheet,
    #[display("legacy document")]
    LegacyDocument,
    #[display("modern document")]
    ModernDocument,
    #[display("pdf")]
    PdfDocument,
    #[display("archive")]
    Archive,
    #[display("unsupported")]
    Unsupported,
}
impl ContentType {
    /// Whether one of the format extractors handles this type.
    pub fn is_extractable(&self) -> bool {
        !matches!(self, Self::Archive | Self::Unsupported)
    }
}

/// A [`ContentType`] together with the detector string it was derived from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub content_type: ContentType,
    /// MIME type reported by the signature detector (or the text heuristic).
    pub detected: String,
}
impl Classification {
    fn new(content_type: ContentType, detected: impl Into<String>) -> Self {
        Self { content_type, detected: detected.into() }
    }
}

/// Classify the file at `path` by reading its header.
///
/// Zero-length and unreadable files are errors; the caller decides what an
/// unclassifiable file means.
#[instrument(level = "debug", fields(content_type, detected))]
pub fn classify(path: &Path) -> Result<Classification> {
    let file = File::open(path).or_raise(|| ErrorKind::Classification)?;
    let mut header = Vec::with_capacity(HEADER_LEN);
    file.take(HEADER_LEN as u64).read_to_end(&mut header).or_raise(|| ErrorKind::Classification)?;
    if header.is_empty() {
        exn::bail!(ErrorKind::Empty);
    }
    let classification = classify_header(&header, path);
    let span = tracing::Span::current();
    span.record("content_type", tracing::field::display(classification.content_type));
    span.record("detected", classification.detected.as_str());
    Ok(classification)
}

/// Classify from an already-read header. `path` is only used for name hints.
pub fn classify_header(header: &[u8], path: &Path) -> Classification {
    let detected = infer::get(header).map(|kind| kind.mime_type());
    if rummage_archive::looks_like_archive(header, path) {
        return Classification::new(ContentType::Archive, detected.unwrap_or("application/x-tar"));
    }
    match detected {
        Some("application/pdf") => Classification::new(ContentType::PdfDocument, "application/pdf"),
        Some(DOCX_MIME) => Classification::new(ContentType::ModernDocument, DOCX_MIME),
        Some(XLSX_MIME) => Classification::new(ContentType::ModernSpreadsheet, XLSX_MIME),
        Some(mime @ "application/vnd.ms-excel") => Classification::new(ContentType::LegacySpreadsheet, mime),
        Some(mime @ "application/msword") => Classification::new(ContentType::LegacyDocument, mime),
        Some("application/zip") => open_xml(header),
        Some(mime) if mime.starts_with("text/") => Classification::new(ContentType::PlainText, mime),
        _ if header.starts_with(&OLE_MAGIC) => compound_file(detected.unwrap_or(OLE_MIME), path),
        // Short signatures (`BZh`, `MZ`) also turn up at the start of prose.
        Some(_) if looks_like_text(header) => Classification::new(ContentType::PlainText, TEXT_MIME),
        Some(mime) => Classification::new(ContentType::Unsupported, mime),
        None if looks_like_text(header) => Classification::new(ContentType::PlainText, TEXT_MIME),
        None => Classification::new(ContentType::Unsupported, UNKNOWN_MIME),
    }
}

/// OOXML packages are zip files; the part names in the local file headers
/// give away which application wrote them.
fn open_xml(header: &[u8]) -> Classification {
    if memmem::find(header, b"word/").is_some() {
        Classification::new(ContentType::ModernDocument, DOCX_MIME)
    } else if memmem::find(header, b"xl/").is_some() {
        Classification::new(ContentType::ModernSpreadsheet, XLSX_MIME)
    } else {
        Classification::new(ContentType::Unsupported, "application/zip")
    }
}

fn compound_file(detected: &str, path: &Path) -> Classification {
    let extension = path.extension().map(|ext| ext.to_string_lossy().to_lowercase());
    match extension.as_deref() {
        Some("xls") => Classification::new(ContentType::LegacySpreadsheet, "application/vnd.ms-excel"),
        Some("doc") => Classification::new(ContentType::LegacyDocument, "application/msword"),
        _ => Classification::new(ContentType::Unsupported, detected),
    }
}

/// A UTF-16 byte order mark, or no NUL bytes and valid UTF-8 apart from
/// (possibly) a multi-byte sequence cut off by the end of the header.
fn looks_like_text(header: &[u8]) -> bool {
    if matches!(header, [0xFF, 0xFE, ..] | [0xFE, 0xFF, ..]) {
        return true;
    }
    if memchr::memchr(0, header).is_some() {
        return false;
    }
    match std::str::from_utf8(header) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn ole_header() -> Vec<u8> {
        let mut header = OLE_MAGIC.to_vec();
        header.resize(1024, 0);
        header
    }

    #[rstest]
    #[case(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec(), "doc.pdf", ContentType::PdfDocument)]
    #[case(b"budget keyword here\n".to_vec(), "notes.txt", ContentType::PlainText)]
    #[case(b"no extension either".to_vec(), "README", ContentType::PlainText)]
    #[case("caf\u{e9} ol\u{e9}".as_bytes().to_vec(), "utf8.txt", ContentType::PlainText)]
    #[case(vec![0x1F, 0x8B, 0x08, 0x00, 0, 0, 0, 0], "data.bin", ContentType::Archive)]
    #[case(vec![0x42, 0x5A, 0x68, 0x39, 0x31], "data.bin", ContentType::Archive)]
    #[case(b"plain words".to_vec(), "misnamed.tar.gz", ContentType::Archive)]
    #[case(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D], "pic.png", ContentType::Unsupported)]
    #[case(vec![0x00, 0x01, 0x02, 0x03], "blob", ContentType::Unsupported)]
    #[case(b"BZh budget notes for the quarter\n".to_vec(), "notes.txt", ContentType::PlainText)]
    #[case(vec![0xFF, 0xFE, b'h', 0, b'i', 0], "utf16le.txt", ContentType::PlainText)]
    #[case(vec![0xFE, 0xFF, 0, b'h', 0, b'i'], "utf16be.txt", ContentType::PlainText)]
    fn classifies_headers(#[case] header: Vec<u8>, #[case] name: &str, #[case] expected: ContentType) {
        assert_eq!(classify_header(&header, Path::new(name)).content_type, expected);
    }

    #[test]
    fn truncated_utf8_tail_is_still_text() {
        let mut header = "prix: 5 ".as_bytes().to_vec();
        header.extend_from_slice(&"\u{20ac}".as_bytes()[..2]);
        assert_eq!(classify_header(&header, Path::new("x")).content_type, ContentType::PlainText);
    }

    #[test]
    fn invalid_utf8_is_not_text() {
        let header = [b'a', 0xFF, b'b', b'c'];
        assert_eq!(classify_header(&header, Path::new("x")).content_type, ContentType::Unsupported);
    }

    #[rstest]
    #[case("book.xls", ContentType::LegacySpreadsheet)]
    #[case("BOOK.XLS", ContentType::LegacySpreadsheet)]
    #[case("letter.doc", ContentType::LegacyDocument)]
    #[case("thing.msg", ContentType::Unsupported)]
    fn compound_files_use_name_hint(#[case] name: &str, #[case] expected: ContentType) {
        assert_eq!(classify_header(&ole_header(), Path::new(name)).content_type, expected);
    }

    #[test]
    fn detected_string_is_mime() {
        let classification = classify_header(b"%PDF-1.4\n", Path::new("a.pdf"));
        assert_eq!(classification.detected, "application/pdf");
        let classification = classify_header(b"hello", Path::new("a.txt"));
        assert_eq!(classification.detected, "text/plain");
    }

    #[test]
    fn classify_reads_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "budget keyword here").unwrap();
        assert_eq!(classify(&path).unwrap().content_type, ContentType::PlainText);
    }

    #[test]
    fn empty_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();
        assert_eq!(*classify(&path).unwrap_err(), ErrorKind::Empty);
    }

    #[test]
    fn missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert_eq!(*classify(&dir.path().join("nope")).unwrap_err(), ErrorKind::Classification);
    }

    #[test]
    fn only_documents_are_extractable() {
        assert!(ContentType::PlainText.is_extractable());
        assert!(ContentType::PdfDocument.is_extractable());
        assert!(!ContentType::Archive.is_extractable());
        assert!(!ContentType::Unsupported.is_extractable());
    }
}
