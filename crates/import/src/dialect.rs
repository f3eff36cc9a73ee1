//! Tokenizer for the bank's CSV export dialect.
//!
//! The export is mostly RFC 4180, except that numeric and reference cells are
//! written as `="value"` so spreadsheets keep them as text. Descriptions are
//! quoted and routinely contain commas.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DialectError {
    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Statement is empty")]
    EmptyInput,
}

/// One logical statement line, split into fields but not yet interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line on which the row starts.
    pub line: usize,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn field(&self, idx: usize) -> &str {
        self.fields.get(idx).map(String::as_str).unwrap_or_default()
    }
}

/// An already-decoded spreadsheet: rows of cell text, supplied by whoever
/// opened the workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Sheet { rows }
    }

    pub fn raw_rows(&self) -> Result<Vec<RawRow>, DialectError> {
        let rows: Vec<RawRow> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, cells)| RawRow {
                line: i + 1,
                fields: cells.iter().map(|c| unwrap_escaped(c)).collect(),
            })
            .filter(|row| row.fields.iter().any(|f| !f.is_empty()))
            .collect();
        if rows.is_empty() {
            return Err(DialectError::EmptyInput);
        }
        Ok(rows)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementContent {
    Csv(Vec<u8>),
    Sheet(Sheet),
}

impl StatementContent {
    pub fn raw_rows(&self) -> Result<Vec<RawRow>, DialectError> {
        match self {
            StatementContent::Csv(bytes) => tokenize(decode(bytes)?),
            StatementContent::Sheet(sheet) => sheet.raw_rows(),
        }
    }
}

/// Decode statement bytes as UTF-8, reporting the line of the first bad byte.
pub fn decode(bytes: &[u8]) -> Result<&str, DialectError> {
    std::str::from_utf8(bytes).map_err(|e| {
        let line = bytes[..e.valid_up_to()]
            .iter()
            .filter(|b| **b == b'\n')
            .count()
            + 1;
        DialectError::Parse {
            line,
            message: "invalid UTF-8".to_string(),
        }
    })
}

#[derive(Default)]
struct FieldBuf {
    text: String,
}

impl FieldBuf {
    fn push(&mut self, c: char) {
        self.text.push(c);
    }

    /// Called when a quote opens. A lone `=` before it is the escape marker.
    fn open_quote(&mut self) {
        if self.text.trim() == "=" {
            self.text.clear();
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn finish(&mut self) -> String {
        let field = self.text.trim().to_string();
        self.text.clear();
        field
    }
}

/// Split dialect text into rows. Commas and newlines inside quotes never split.
pub fn tokenize(text: &str) -> Result<Vec<RawRow>, DialectError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(DialectError::EmptyInput);
    }

    let mut rows = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = FieldBuf::default();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_line = 1;
    let mut quote_line = 1;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => {
                field.open_quote();
                in_quotes = true;
                quote_line = line;
            }
            ',' if !in_quotes => fields.push(field.finish()),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                fields.push(field.finish());
                push_row(&mut rows, row_line, std::mem::take(&mut fields));
                line += 1;
                row_line = line;
            }
            '\n' => {
                field.push('\n');
                line += 1;
            }
            other => field.push(other),
        }
    }

    if in_quotes {
        return Err(DialectError::Parse {
            line: quote_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field.finish());
        push_row(&mut rows, row_line, fields);
    }

    Ok(rows)
}

fn push_row(rows: &mut Vec<RawRow>, line: usize, fields: Vec<String>) {
    if fields.iter().any(|f| !f.is_empty()) {
        rows.push(RawRow { line, fields });
    }
}

/// Strip the `="…"` (or plain `"…"`) wrapper from a single cell.
pub fn unwrap_escaped(cell: &str) -> String {
    let cell = cell.trim();
    let inner = cell
        .strip_prefix("=\"")
        .or_else(|| cell.strip_prefix('"'))
        .and_then(|rest| rest.strip_suffix('"'));
    match inner {
        Some(inner) => inner.replace("\"\"", "\"").trim().to_string(),
        None => cell.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(text: &str) -> Vec<Vec<String>> {
        tokenize(text)
            .unwrap()
            .into_iter()
            .map(|r| r.fields)
            .collect()
    }

    #[test]
    fn comma_inside_quotes_stays_in_one_field() {
        let rows = fields("a,\"UPI/JOHND/transfer, school fee\",c\n");
        assert_eq!(rows, vec![vec!["a", "UPI/JOHND/transfer, school fee", "c"]]);
    }

    #[test]
    fn escaped_cells_are_unwrapped() {
        let rows = fields(
            r#"="", "01-04-2024","","","UPI/JOHND/transfer, school fee",,,"502.00","""#,
        );
        assert_eq!(
            rows,
            vec![vec![
                "",
                "01-04-2024",
                "",
                "",
                "UPI/JOHND/transfer, school fee",
                "",
                "",
                "502.00",
                ""
            ]]
        );
    }

    #[test]
    fn escaped_cell_may_contain_commas() {
        let rows = fields("=\"1,234.00\",x\n");
        assert_eq!(rows, vec![vec!["1,234.00", "x"]]);
    }

    #[test]
    fn doubled_quote_collapses() {
        let rows = fields("\"say \"\"hi\"\"\",b\n");
        assert_eq!(rows, vec![vec!["say \"hi\"", "b"]]);
    }

    #[test]
    fn crlf_and_quoted_newlines() {
        let rows = tokenize("a,b\r\n\"multi\nline\",c\r\nd,e").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].fields, vec!["multi\nline", "c"]);
        assert_eq!(rows[1].line, 2);
        assert_eq!(rows[2].line, 4);
        assert_eq!(rows[2].fields, vec!["d", "e"]);
    }

    #[test]
    fn blank_rows_are_dropped() {
        let rows = tokenize("a,b\n\n,,\nc,d\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].line, 4);
    }

    #[test]
    fn unterminated_quote_reports_opening_line() {
        let err = tokenize("h1,h2\nok,row\nbad,\"never closed\nmore text\n").unwrap_err();
        assert_eq!(
            err,
            DialectError::Parse {
                line: 3,
                message: "unterminated quoted field".into()
            }
        );
    }

    #[test]
    fn empty_input() {
        assert_eq!(tokenize(""), Err(DialectError::EmptyInput));
        assert_eq!(tokenize("  \n\r\n"), Err(DialectError::EmptyInput));
        assert_eq!(tokenize("\u{feff}"), Err(DialectError::EmptyInput));
    }

    #[test]
    fn decode_reports_line_of_bad_byte() {
        let bytes = b"ok\nstill ok\n\xff\xfe";
        assert!(matches!(decode(bytes), Err(DialectError::Parse { line: 3, .. })));
        assert_eq!(decode(b"fine").unwrap(), "fine");
    }

    #[test]
    fn sheet_cells_are_unwrapped() {
        let sheet = Sheet::new(vec![
            vec!["=\"0012\"".into(), "\"quoted\"".into(), "plain".into()],
            vec![String::new(), String::new()],
        ]);
        let rows = sheet.raw_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields, vec!["0012", "quoted", "plain"]);
        assert_eq!(Sheet::default().raw_rows(), Err(DialectError::EmptyInput));
    }

    #[test]
    fn content_dispatch() {
        let csv = StatementContent::Csv(b"a,\"b,c\"\n".to_vec());
        assert_eq!(csv.raw_rows().unwrap()[0].fields, vec!["a", "b,c"]);
        assert_eq!(
            StatementContent::Csv(Vec::new()).raw_rows(),
            Err(DialectError::EmptyInput)
        );
    }
}
