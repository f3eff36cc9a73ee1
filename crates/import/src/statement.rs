use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::dialect::{DialectError, RawRow, StatementContent};

/// Positional meaning of statement columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub date: usize,
    pub description: usize,
    pub credit: usize,
    pub reference: Option<usize>,
    pub debit: Option<usize>,
}

impl Default for ColumnLayout {
    /// Column order of the bank's export when no header row is present:
    /// serial, txn date, value date, reference, description, branch, debit,
    /// credit, balance.
    fn default() -> Self {
        Self {
            date: 1,
            description: 4,
            credit: 7,
            reference: Some(3),
            debit: Some(6),
        }
    }
}

const DATE_LABELS: &[&str] = &["txn date", "transaction date", "tran date", "date", "posting date"];
const CREDIT_LABELS: &[&str] = &["credit", "deposit", "deposit amt.", "credit amount", "cr amount"];
const DESCRIPTION_LABELS: &[&str] = &["description", "narration", "particulars", "details", "remarks"];
const REFERENCE_LABELS: &[&str] = &[
    "ref no./cheque no.",
    "ref no.",
    "ref no",
    "reference",
    "reference no.",
    "chq./ref.no.",
    "cheque no.",
];
const DEBIT_LABELS: &[&str] = &["debit", "withdrawal", "withdrawal amt.", "debit amount", "dr amount"];

fn normalize_label(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn col_index(labels: &[String], variants: &[&str]) -> Option<usize> {
    labels.iter().position(|l| variants.contains(&l.as_str()))
}

impl ColumnLayout {
    /// Map a header row positionally. Needs at least a date and a credit column.
    pub fn from_header(fields: &[String]) -> Option<Self> {
        let labels: Vec<String> = fields.iter().map(|f| normalize_label(f)).collect();
        let date = col_index(&labels, DATE_LABELS)?;
        let credit = col_index(&labels, CREDIT_LABELS)?;
        let fallback = ColumnLayout::default();
        Some(Self {
            date,
            credit,
            description: col_index(&labels, DESCRIPTION_LABELS).unwrap_or(fallback.description),
            reference: col_index(&labels, REFERENCE_LABELS),
            debit: col_index(&labels, DEBIT_LABELS),
        })
    }
}

/// A raw row read through a column layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRow {
    pub line: usize,
    pub date: String,
    pub description: String,
    pub reference: String,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
}

impl StatementRow {
    /// Money coming in. Debit-only and zero rows are not fee payments.
    pub fn is_credit(&self) -> bool {
        self.credit.is_some_and(|c| c > Decimal::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub layout: ColumnLayout,
    /// Line of the detected header, `None` when the default layout was used.
    pub header_line: Option<usize>,
    pub rows: Vec<StatementRow>,
}

impl Statement {
    pub fn credits(&self) -> impl Iterator<Item = &StatementRow> {
        self.rows.iter().filter(|r| r.is_credit())
    }
}

pub fn parse_statement(content: &StatementContent) -> Result<Statement, DialectError> {
    Ok(interpret(content.raw_rows()?))
}

/// Detect the header, then read every following row through the layout.
pub fn interpret(raw: Vec<RawRow>) -> Statement {
    let header = raw
        .iter()
        .enumerate()
        .find_map(|(i, row)| ColumnLayout::from_header(&row.fields).map(|layout| (i, layout)));

    let (layout, header_line, data) = match header {
        Some((idx, layout)) => {
            let line = raw[idx].line;
            (layout, Some(line), &raw[idx + 1..])
        }
        None => {
            tracing::debug!("no statement header found, using default column order");
            (ColumnLayout::default(), None, &raw[..])
        }
    };

    let rows = data
        .iter()
        .filter_map(|row| read_row(row, &layout))
        .collect();

    Statement {
        layout,
        header_line,
        rows,
    }
}

fn read_row(row: &RawRow, layout: &ColumnLayout) -> Option<StatementRow> {
    let date = row.field(layout.date).trim();
    if date.is_empty() {
        tracing::debug!(line = row.line, "skipping row without a date");
        return None;
    }

    let credit = match parse_amount(row.field(layout.credit)) {
        Ok(credit) => credit,
        Err(raw) => {
            tracing::warn!(line = row.line, value = %raw, "skipping row with unreadable credit amount");
            return None;
        }
    };
    let debit = layout
        .debit
        .and_then(|col| parse_amount(row.field(col)).ok())
        .flatten();

    Some(StatementRow {
        line: row.line,
        date: date.to_string(),
        description: row.field(layout.description).trim().to_string(),
        reference: layout
            .reference
            .map(|col| row.field(col).trim().to_string())
            .unwrap_or_default(),
        debit,
        credit,
    })
}

/// Parse an exact decimal amount. Empty cells are `None`; anything that is
/// not a number after removing separators and currency marks is an error
/// carrying the cleaned text.
pub fn parse_amount(s: &str) -> Result<Option<Decimal>, String> {
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '₹' | '$' | ' ' | '\u{a0}'))
        .collect();
    let cleaned = cleaned
        .strip_suffix("Cr")
        .or_else(|| cleaned.strip_suffix("CR"))
        .unwrap_or(&cleaned);
    if cleaned.is_empty() {
        return Ok(None);
    }
    Decimal::from_str(cleaned)
        .map(Some)
        .map_err(|_| cleaned.to_string())
}
