use rust_decimal::Decimal;
use thiserror::Error;

use crate::transaction::TransactionId;

/// A registry mutation that would break one of its invariants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Category '{name}' would be a second variable-fee category (already have '{existing}')")]
    SecondWildcard { name: String, existing: String },
    #[error("Category '{name}' has the same fee {fee} as '{existing}'")]
    DuplicateFee {
        name: String,
        existing: String,
        fee: Decimal,
    },
    #[error("Category '{0}' already exists")]
    DuplicateCategory(String),
    #[error("Short name '{0}' is already mapped")]
    DuplicateShortName(String),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("'{0}' is reserved for transactions that match no category")]
    ReservedName(String),
    #[error("{field} '{value}' has surrounding spaces or quotes")]
    NotCanonical { field: &'static str, value: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("Category not found: {0}")]
    Category(String),
    #[error("Short name not mapped: {0}")]
    ShortName(String),
    #[error("Transaction not found: {0}")]
    Transaction(TransactionId),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
}
