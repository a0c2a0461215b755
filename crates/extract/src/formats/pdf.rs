use crate::error::{ErrorKind, Result};
use crate::formats::FragmentScanner;
use exn::ResultExt;
use lopdf::Document;
use std::path::Path;

/// Page by page, in page order. Documents whose trailer names an `Encrypt`
/// dictionary are refused before any text is pulled out of them.
pub(crate) fn extract(path: &Path, scanner: &mut FragmentScanner<'_>) -> Result<()> {
    let bytes = std::fs::read(path).or_raise(|| ErrorKind::Io)?;
    let document = Document::load_mem(&bytes).map_err(|e| ErrorKind::Malformed(e.to_string()))?;
    if document.trailer.has(b"Encrypt") {
        exn::bail!(ErrorKind::Encrypted);
    }
    for page in document.get_pages().into_keys() {
        let text = document.extract_text(&[page]).map_err(|e| ErrorKind::Malformed(e.to_string()))?;
        scanner.fragment(&text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::testing::scan_with;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};
    use tempfile::TempDir;

    /// One page of Courier text per entry in `pages`.
    fn pdf(pages: &[&str], encrypted: bool) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        if encrypted {
            let encrypt_id = doc.add_object(dictionary! { "Filter" => "Standard", "V" => 1, "R" => 2 });
            doc.trailer.set("Encrypt", encrypt_id);
        }
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn scan_pdf(bytes: Vec<u8>) -> Result<(crate::ExtractionReport, Vec<crate::MatchRecord>)> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, bytes).unwrap();
        scan_with(&["budget"], &path, |scanner| extract(&path, scanner))
    }

    #[test]
    fn pages_in_order() {
        let (report, records) = scan_pdf(pdf(&["Budget overview", "Appendix", "budget detail"], false)).unwrap();
        assert_eq!(report.fragments, 3);
        assert_eq!(records.len(), 2);
        assert!(records[0].fragment.contains("Budget overview"));
        assert!(records[1].fragment.contains("budget detail"));
    }

    #[test]
    fn encrypted_is_refused() {
        let err = scan_pdf(pdf(&["budget"], true)).unwrap_err();
        assert_eq!(*err, ErrorKind::Encrypted);
    }

    #[test]
    fn mentioning_encrypt_in_text_is_not_encryption() {
        let bytes = pdf(&["budget: see the /Encrypt dictionary spec"], false);
        assert!(memchr::memmem::find(&bytes, b"/Encrypt").is_some());
        let (report, records) = scan_pdf(bytes).unwrap();
        assert_eq!(report.matches, 1);
        assert!(records[0].fragment.contains("/Encrypt dictionary"));
    }

    #[test]
    fn corrupt_is_malformed() {
        let err = scan_pdf(b"%PDF-1.7\nthis is not really a pdf".to_vec()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Malformed(_)));
    }
}
