use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::money::Money;

/// Opaque transaction identifier, unique within one statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    /// Deterministic id from the identifying parts of a statement row, so the
    /// same statement ingested twice produces the same ids.
    pub fn derive(parts: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        let digest = hasher.finalize();
        TransactionId(digest[..8].iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn random() -> Self {
        TransactionId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        TransactionId(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    #[default]
    Statement,
    Duplicate { of: TransactionId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub date: String,
    pub description: String,
    #[serde(default)]
    pub reference: String,
    pub amount: Decimal,
    pub raw_short_name: String,
    pub resolved_name: String,
    pub category: String,
    #[serde(default)]
    pub origin: Origin,
}

impl Transaction {
    pub fn money(&self) -> Money {
        Money::from_decimal(self.amount)
    }

    /// A copy with a fresh id that remembers where it came from.
    pub fn duplicate(&self) -> Transaction {
        Transaction {
            id: TransactionId::random(),
            origin: Origin::Duplicate {
                of: self.id.clone(),
            },
            ..self.clone()
        }
    }
}

/// Fields a user may change on a held transaction. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    pub date: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub raw_short_name: Option<String>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.description.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.raw_short_name.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Transaction {
        Transaction {
            id: TransactionId::derive(&["01-04-2024", "UPI/JOHND/transfer", "", "502.00", "0"]),
            date: "01-04-2024".into(),
            description: "UPI/JOHND/transfer".into(),
            reference: String::new(),
            amount: dec!(502.00),
            raw_short_name: "JOHND".into(),
            resolved_name: "John Doe".into(),
            category: "Piano".into(),
            origin: Origin::Statement,
        }
    }

    #[test]
    fn derived_ids_are_stable_and_distinct() {
        let a = TransactionId::derive(&["a", "b"]);
        assert_eq!(a, TransactionId::derive(&["a", "b"]));
        assert_eq!(a.as_str().len(), 16);
        // Part boundaries matter.
        assert_ne!(TransactionId::derive(&["ab", ""]), TransactionId::derive(&["a", "b"]));
    }

    #[test]
    fn duplicate_gets_new_id_and_origin() {
        let original = sample();
        let copy = original.duplicate();
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.origin, Origin::Duplicate { of: original.id.clone() });
        assert_eq!(copy.amount, original.amount);
        assert_eq!(copy.resolved_name, original.resolved_name);
    }

    #[test]
    fn serializes_camel_case_with_origin_tag() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["rawShortName"], "JOHND");
        assert_eq!(value["resolvedName"], "John Doe");
        assert_eq!(value["origin"]["kind"], "statement");
        let back: Transaction = serde_json::from_value(value).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn empty_patch() {
        assert!(TransactionPatch::default().is_empty());
        let patch = TransactionPatch {
            amount: Some(dec!(1)),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
