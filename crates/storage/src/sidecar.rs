use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use feetrack_core::{Transaction, TransactionId};

use crate::hash::sidecar_path;
use crate::store::{read_json, write_json, PersistenceError};

/// Identity of the statement an edit log belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementRef {
    pub file_name: String,
    /// SHA-256 hex of the statement bytes the edits were made against.
    pub fingerprint: String,
}

/// The persisted state of a user's edits to one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditLog {
    pub statement: StatementRef,
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub deleted: Vec<TransactionId>,
    pub saved_at: DateTime<Utc>,
}

/// One sidecar document per statement file name, all in one directory.
#[derive(Debug, Clone)]
pub struct SidecarStore {
    dir: PathBuf,
}

impl SidecarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, statement_file_name: &str) -> PathBuf {
        sidecar_path(&self.dir, statement_file_name)
    }

    pub fn load(&self, statement_file_name: &str) -> Result<Option<EditLog>, PersistenceError> {
        read_json(&self.path_for(statement_file_name))
    }

    pub fn save(&self, log: &EditLog) -> Result<PathBuf, PersistenceError> {
        let path = self.path_for(&log.statement.file_name);
        write_json(&path, log)?;
        tracing::info!(
            path = %path.display(),
            transactions = log.transactions.len(),
            deleted = log.deleted.len(),
            "saved statement edits"
        );
        Ok(path)
    }

    /// Forget saved edits. Returns whether a sidecar existed.
    pub fn remove(&self, statement_file_name: &str) -> Result<bool, PersistenceError> {
        let path = self.path_for(statement_file_name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PersistenceError::io(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use feetrack_core::Origin;
    use rust_decimal_macros::dec;

    fn log(file_name: &str) -> EditLog {
        EditLog {
            statement: StatementRef {
                file_name: file_name.to_string(),
                fingerprint: "ab".repeat(32),
            },
            transactions: vec![Transaction {
                id: TransactionId::from("0011223344556677"),
                date: "01-04-2024".into(),
                description: "UPI/JOHND/transfer, school fee".into(),
                reference: String::new(),
                amount: dec!(502.00),
                raw_short_name: "JOHND".into(),
                resolved_name: "John Doe".into(),
                category: "Piano".into(),
                origin: Origin::Statement,
            }],
            deleted: vec![TransactionId::from("deadbeefdeadbeef")],
            saved_at: Utc.with_ymd_and_hms(2024, 4, 30, 18, 0, 0).unwrap(),
        }
    }

    #[test]
    fn save_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = SidecarStore::new(dir.path().join("edits"));
        assert!(store.load("apr.csv").unwrap().is_none());

        let path = store.save(&log("apr.csv")).unwrap();
        assert_eq!(path, store.path_for("apr.csv"));
        assert_eq!(store.load("apr.csv").unwrap(), Some(log("apr.csv")));

        assert!(store.remove("apr.csv").unwrap());
        assert!(!store.remove("apr.csv").unwrap());
        assert!(store.load("apr.csv").unwrap().is_none());
    }

    #[test]
    fn document_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = SidecarStore::new(dir.path());
        let path = store.save(&log("may.csv")).unwrap();
        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(raw["statement"]["fileName"], "may.csv");
        assert_eq!(raw["savedAt"], "2024-04-30T18:00:00Z");
        assert_eq!(raw["transactions"][0]["resolvedName"], "John Doe");
        assert_eq!(raw["deleted"][0], "deadbeefdeadbeef");
    }
}
