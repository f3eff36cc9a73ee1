//! Two-column bulk import and export of short-name mappings. Workbook
//! reading and writing lives in [`crate::workbook`].

use std::io::{Read, Write};

use feetrack_core::NameRegistry;
use thiserror::Error;

use crate::dialect::{unwrap_escaped, Sheet};
use crate::workbook::{read_workbook, WorkbookError};

pub const EXPORT_HEADER: [&str; 2] = ["Short Name", "Full Name"];

#[derive(Error, Debug)]
pub enum MappingImportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error(transparent)]
    Workbook(#[from] WorkbookError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Rows with fewer than two cells or a blank key or value.
    pub skipped: usize,
}

/// Read two-column CSV rows. Extra columns are ignored.
pub fn read_csv_rows<R: Read>(data: R) -> Result<Vec<Vec<String>>, MappingImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(unwrap_escaped).collect());
    }
    Ok(rows)
}

/// Where a bulk import comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingSource {
    Csv(Vec<u8>),
    /// Raw `.xlsx`/`.xls`/`.ods` bytes; the first worksheet is read.
    Workbook(Vec<u8>),
    Sheet(Sheet),
}

impl MappingSource {
    pub fn rows(&self) -> Result<Vec<Vec<String>>, MappingImportError> {
        match self {
            MappingSource::Csv(bytes) => read_csv_rows(bytes.as_slice()),
            MappingSource::Workbook(bytes) => Ok(read_sheet_rows(&read_workbook(bytes)?)),
            MappingSource::Sheet(sheet) => Ok(read_sheet_rows(sheet)),
        }
    }
}

pub fn read_sheet_rows(sheet: &Sheet) -> Vec<Vec<String>> {
    sheet
        .rows
        .iter()
        .map(|cells| cells.iter().map(|c| unwrap_escaped(c)).collect())
        .collect()
}

fn is_header(row: &[String]) -> bool {
    match row {
        [short, full, ..] => {
            let short = short.to_lowercase();
            let full = full.to_lowercase();
            short.contains("short") && (full.contains("full") || full.contains("name"))
        }
        _ => false,
    }
}

/// Merge rows into the registry. Existing keys absent from the input are kept.
pub fn apply_import(registry: &mut NameRegistry, rows: &[Vec<String>]) -> ImportReport {
    let mut report = ImportReport::default();
    let body = match rows.first() {
        Some(first) if is_header(first) => &rows[1..],
        _ => rows,
    };

    for row in body {
        let (short, full) = match row.as_slice() {
            [short, full, ..] if !short.trim().is_empty() && !full.trim().is_empty() => {
                (short.trim(), full.trim())
            }
            _ => {
                report.skipped += 1;
                continue;
            }
        };
        match registry.get(short) {
            Some(existing) if existing == full => report.unchanged += 1,
            _ => match registry.upsert(short, full) {
                Ok(Some(_)) => report.updated += 1,
                Ok(None) => report.added += 1,
                Err(_) => report.skipped += 1,
            },
        }
    }

    tracing::info!(
        added = report.added,
        updated = report.updated,
        unchanged = report.unchanged,
        skipped = report.skipped,
        "imported name mappings"
    );
    report
}

/// Write every mapping, header first, in registry order.
pub fn export_csv<W: Write>(registry: &NameRegistry, writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(EXPORT_HEADER)?;
    for mapping in registry.iter() {
        writer.write_record([&mapping.short_name, &mapping.full_name])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &str) -> Vec<Vec<String>> {
        read_csv_rows(data.as_bytes()).unwrap()
    }

    #[test]
    fn import_with_header_counts_added_and_updated() {
        let mut names = NameRegistry::from_pairs([("JOHND", "John Doe"), ("KASI", "Kasi")]).unwrap();
        let report = apply_import(
            &mut names,
            &rows("Short Name,Full Name\nJOHND,John Doe Jr\nKASI,Kasi\nNEWKID,New Kid\n"),
        );
        assert_eq!(
            report,
            ImportReport {
                added: 1,
                updated: 1,
                unchanged: 1,
                skipped: 0
            }
        );
        assert_eq!(names.get("JOHND"), Some("John Doe Jr"));
        assert_eq!(names.get("NEWKID"), Some("New Kid"));
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn import_without_header_never_removes() {
        let mut names = NameRegistry::from_pairs([("KEEP ME", "Kept")]).unwrap();
        let report = apply_import(&mut names, &rows("A,Alpha\n,Missing key\nonly-one\n"));
        assert_eq!(report.added, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(names.get("KEEP ME"), Some("Kept"));
    }

    #[test]
    fn quoted_and_escaped_cells() {
        let mut names = NameRegistry::new();
        apply_import(&mut names, &rows("\"DHARINI  N\",\"Dharini, N\"\n=\"0042\",Roll Forty Two\n"));
        assert_eq!(names.get("DHARINI  N"), Some("Dharini, N"));
        assert_eq!(names.get("0042"), Some("Roll Forty Two"));
    }

    #[test]
    fn sheet_import() {
        let sheet = Sheet::new(vec![
            vec!["short".into(), "full name".into()],
            vec!["MEENA KAI".into(), "Meena Kailash".into()],
        ]);
        let mut names = NameRegistry::new();
        let report = apply_import(&mut names, &read_sheet_rows(&sheet));
        assert_eq!(report.added, 1);
        assert_eq!(names.get("MEENA KAI"), Some("Meena Kailash"));
    }

    #[test]
    fn export_then_import_round_trips() {
        let original = NameRegistry::from_pairs([
            ("SUNDARA P", "Dhanalakshmi V"),
            ("Mrs V N J", "Mrs Jayanthi Sampath"),
            ("DHARINI  N", "Dharini N"),
            ("QUOTE\"D", "Comma, Name"),
            ("A \"B\" C", "Inner Quotes"),
            ("=7", "Equals Seven"),
            ("\"Q", "Leading Quote"),
            ("Q\"", "=\"half"),
        ])
        .unwrap();

        let mut buf = Vec::new();
        export_csv(&original, &mut buf).unwrap();

        let mut restored = NameRegistry::new();
        let report = apply_import(&mut restored, &read_csv_rows(buf.as_slice()).unwrap());
        assert_eq!(report.added, 8);
        assert_eq!(restored, original);
    }

    #[test]
    fn keys_the_import_would_rewrite_never_enter_the_registry() {
        let mut names = NameRegistry::new();
        assert!(names.add(" PADDED ", "Padded").is_err());
        assert!(names.add("\"Q\"", "Quoted").is_err());
        assert!(names.add("=\"7\"", "Escaped").is_err());

        // The same cells arriving through an import are stored unwrapped.
        let report = apply_import(&mut names, &rows("\" PADDED \",Padded\n=\"7\",Escaped\n"));
        assert_eq!(report.added, 2);
        assert_eq!(names.get("PADDED"), Some("Padded"));
        assert_eq!(names.get("7"), Some("Escaped"));
    }
}
