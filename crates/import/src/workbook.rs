//! Spreadsheet input and output. Workbooks are read into a [`Sheet`] so the
//! statement and mapping paths never see the file format.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use feetrack_core::NameRegistry;
use rust_xlsxwriter::{Format, Workbook};
use thiserror::Error;

use crate::dialect::Sheet;
use crate::mappings::EXPORT_HEADER;

/// Dates in bank statements are `DD-MM-YYYY` text; spreadsheet dates are
/// rendered the same way.
const DATE_FORMAT: &str = "%d-%m-%Y";

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("Could not read workbook: {0}")]
    Read(#[from] calamine::Error),
    #[error("Workbook has no worksheets")]
    NoSheet,
    #[error("Could not write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),
}

pub fn is_workbook_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)))
}

/// Read the first worksheet as rows of cell text.
pub fn read_workbook(bytes: &[u8]) -> Result<Sheet, WorkbookError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook.worksheet_range_at(0).ok_or(WorkbookError::NoSheet)??;
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    tracing::debug!(rows = rows.len(), "read worksheet");
    Ok(Sheet::new(rows))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|dt| dt.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

/// Every mapping as an `.xlsx` document: bold header, then one row per
/// mapping in registry order.
pub fn export_workbook(registry: &NameRegistry) -> Result<Vec<u8>, WorkbookError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Name Mappings")?;
        for (col, label) in (0u16..).zip(EXPORT_HEADER) {
            sheet.write_string_with_format(0, col, label, &bold)?;
        }
        for (row, mapping) in (1u32..).zip(registry.iter()) {
            sheet.write_string(row, 0, &mapping.short_name)?;
            sheet.write_string(row, 1, &mapping.full_name)?;
        }
        sheet.set_column_width(0, 24.0)?;
        sheet.set_column_width(1, 36.0)?;
    }
    Ok(workbook.save_to_buffer()?)
}
