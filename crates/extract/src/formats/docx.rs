use crate::error::{ErrorKind, Result};
use crate::formats::FragmentScanner;
use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild, TableRowChild};
use exn::ResultExt;
use std::path::Path;

/// Body paragraphs in document order; tables contribute the paragraphs of
/// each cell, row by row.
pub(crate) fn extract(path: &Path, scanner: &mut FragmentScanner<'_>) -> Result<()> {
    let bytes = std::fs::read(path).or_raise(|| ErrorKind::Io)?;
    let document = docx_rs::read_docx(&bytes).map_err(|e| ErrorKind::Malformed(e.to_string()))?;
    for child in &document.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => scanner.fragment(&paragraph_text(paragraph))?,
            DocumentChild::Table(table) => scan_table(table, scanner)?,
            _ => {},
        }
    }
    Ok(())
}

fn scan_table(table: &Table, scanner: &mut FragmentScanner<'_>) -> Result<()> {
    for row in &table.rows {
        let TableChild::TableRow(row) = row;
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell;
            for content in &cell.children {
                if let TableCellContent::Paragraph(paragraph) = content {
                    scanner.fragment(&paragraph_text(paragraph))?;
                }
            }
        }
    }
    Ok(())
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    push_children(&paragraph.children, &mut text);
    text
}

fn push_children(children: &[ParagraphChild], text: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for run_child in &run.children {
                    match run_child {
                        RunChild::Text(t) => text.push_str(&t.text),
                        RunChild::Tab(_) => text.push('\t'),
                        _ => {},
                    }
                }
            },
            ParagraphChild::Hyperlink(link) => push_children(&link.children, text),
            _ => {},
        }
    }
}
