pub mod classify;
pub mod dialect;
pub mod identity;
pub mod mappings;
pub mod statement;
pub mod workbook;
pub(crate) mod util;

pub use classify::{AmountClassifier, Classification};
pub use dialect::{DialectError, RawRow, Sheet, StatementContent};
pub use identity::{extract_short_name, CollisionPolicy, IdentityResolver, MatchTier, Resolution};
pub use mappings::{ImportReport, MappingImportError, MappingSource};
pub use statement::{parse_statement, ColumnLayout, Statement, StatementRow};
pub use workbook::{export_workbook, is_workbook_path, read_workbook, WorkbookError};
