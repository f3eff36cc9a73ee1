use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{NotFoundError, RegistryError, ValidationError};

/// Label assigned when nothing matches and no variable-fee category exists.
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    /// `None` marks the variable-fee (wildcard) category.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub fee: Option<Decimal>,
}

impl Category {
    pub fn new(name: &str, fee: Option<Decimal>) -> Self {
        Category {
            name: name.trim().to_string(),
            fee,
        }
    }

    pub fn fixed(name: &str, fee: Decimal) -> Self {
        Category::new(name, Some(fee))
    }

    pub fn variable(name: &str) -> Self {
        Category::new(name, None)
    }

    pub fn is_wildcard(&self) -> bool {
        self.fee.is_none()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fee {
            Some(fee) => write!(f, "{} (₹{})", self.name, fee.normalize()),
            None => write!(f, "{} (variable)", self.name),
        }
    }
}

pub const DEFAULT_CATEGORIES: &[(&str, Option<i64>)] = &[
    ("Namasankeerthanam", Some(502)),
    ("Shloka Class", Some(503)),
    ("Rishabhaa Class", Some(750)),
    ("Donations", None),
];

/// Ordered set of categories. Every mutation is validated against the
/// invariants: unique names, at most one wildcard, pairwise distinct fees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRegistry {
    categories: Vec<Category>,
}

impl CategoryRegistry {
    pub fn new(categories: Vec<Category>) -> Result<Self, ValidationError> {
        let mut registry = CategoryRegistry::default();
        for category in categories {
            registry.add(category)?;
        }
        Ok(registry)
    }

    pub fn with_defaults() -> Self {
        let categories = DEFAULT_CATEGORIES
            .iter()
            .map(|(name, fee)| Category::new(name, fee.map(Decimal::from)))
            .collect();
        CategoryRegistry { categories }
    }

    pub fn add(&mut self, category: Category) -> Result<(), ValidationError> {
        check(&category, self.categories.iter())?;
        self.categories.push(category);
        Ok(())
    }

    /// Replace the category called `name`, keeping its position.
    pub fn edit(&mut self, name: &str, replacement: Category) -> Result<(), RegistryError> {
        let idx = self
            .position(name)
            .ok_or_else(|| NotFoundError::Category(name.to_string()))?;
        let others = self
            .categories
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, c)| c);
        check(&replacement, others)?;
        self.categories[idx] = replacement;
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<Category, NotFoundError> {
        let idx = self
            .position(name)
            .ok_or_else(|| NotFoundError::Category(name.to_string()))?;
        Ok(self.categories.remove(idx))
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn wildcard(&self) -> Option<&Category> {
        self.categories.iter().find(|c| c.is_wildcard())
    }

    /// The fixed-fee category whose fee equals `amount` exactly.
    pub fn by_fee(&self, amount: Decimal) -> Option<&Category> {
        self.categories.iter().find(|c| c.fee == Some(amount))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn as_slice(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }
}

fn check<'a>(
    candidate: &Category,
    others: impl Iterator<Item = &'a Category>,
) -> Result<(), ValidationError> {
    if candidate.name.trim().is_empty() {
        return Err(ValidationError::Empty("Category name"));
    }
    if candidate.name.eq_ignore_ascii_case(UNCATEGORIZED) {
        return Err(ValidationError::ReservedName(candidate.name.clone()));
    }
    for other in others {
        if other.name == candidate.name {
            return Err(ValidationError::DuplicateCategory(candidate.name.clone()));
        }
        match (candidate.fee, other.fee) {
            (None, None) => {
                return Err(ValidationError::SecondWildcard {
                    name: candidate.name.clone(),
                    existing: other.name.clone(),
                })
            }
            (Some(a), Some(b)) if a == b => {
                return Err(ValidationError::DuplicateFee {
                    name: candidate.name.clone(),
                    existing: other.name.clone(),
                    fee: a,
                })
            }
            _ => {}
        }
    }
    Ok(())
}
