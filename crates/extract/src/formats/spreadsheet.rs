use crate::error::{ErrorKind, Result};
use crate::formats::FragmentScanner;
use calamine::{Data, Range, Reader, Xls, XlsError, Xlsx, open_workbook};
use std::io::{Read, Seek};
use std::path::Path;

/// Legacy (BIFF) workbooks: every populated cell of every sheet.
pub(crate) fn extract_legacy(path: &Path, scanner: &mut FragmentScanner<'_>) -> Result<()> {
    let mut workbook: Xls<_> = open_workbook(path).map_err(|e| match e {
        XlsError::Password => ErrorKind::Encrypted,
        e => ErrorKind::Malformed(e.to_string()),
    })?;
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name).map_err(|e| ErrorKind::Malformed(e.to_string()))?;
        tracing::trace!(sheet = %name, "scanning sheet");
        scan_range(&range, scanner)?;
    }
    Ok(())
}

/// OOXML workbooks, streamed cell by cell. Rows at or past `row_limit`
/// (counted from the top of the sheet, not from the first populated row) are
/// never read.
pub(crate) fn extract_modern(path: &Path, row_limit: usize, scanner: &mut FragmentScanner<'_>) -> Result<()> {
    let workbook: Xlsx<_> = open_workbook(path).map_err(|e: calamine::XlsxError| ErrorKind::Malformed(e.to_string()))?;
    scan_streaming(workbook, row_limit, scanner)
}

fn scan_streaming<RS: Read + Seek>(
    mut workbook: Xlsx<RS>,
    row_limit: usize,
    scanner: &mut FragmentScanner<'_>,
) -> Result<()> {
    for name in workbook.sheet_names() {
        tracing::trace!(sheet = %name, "scanning sheet");
        let mut cells = workbook.worksheet_cells_reader(&name).map_err(|e| ErrorKind::Malformed(e.to_string()))?;
        while let Some(cell) = cells.next_cell().map_err(|e| ErrorKind::Malformed(e.to_string()))? {
            // Sheet XML lists rows in ascending order.
            if cell.get_position().0 as usize >= row_limit {
                break;
            }
            let value = Data::from(cell.get_value().clone());
            if !matches!(value, Data::Empty) {
                scanner.fragment(&value.to_string())?;
            }
        }
    }
    Ok(())
}

pub(crate) fn scan_range(range: &Range<Data>, scanner: &mut FragmentScanner<'_>) -> Result<()> {
    for cell in range.used_cells().map(|(_, _, cell)| cell).filter(|cell| !matches!(cell, Data::Empty)) {
        scanner.fragment(&cell.to_string())?;
    }
    Ok(())
}
