use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use feetrack_core::{Category, CategoryRegistry};

use crate::store::{read_json, write_json, PersistenceError};

#[derive(Debug, Serialize, Deserialize)]
struct CategoryDocument {
    categories: Vec<Category>,
}

/// `{"categories": [{"name": ..., "fee": number|null}, ...]}` on disk.
#[derive(Debug, Clone)]
pub struct CategoryStore {
    path: PathBuf,
}

impl CategoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry, writing the default set first if the file is absent.
    pub fn load_or_create(&self) -> Result<CategoryRegistry, PersistenceError> {
        match read_json::<CategoryDocument>(&self.path)? {
            Some(doc) => {
                let registry = CategoryRegistry::new(doc.categories).map_err(|source| {
                    PersistenceError::Validation {
                        path: self.path.clone(),
                        source,
                    }
                })?;
                tracing::info!(count = registry.len(), path = %self.path.display(), "loaded categories");
                Ok(registry)
            }
            None => {
                let registry = CategoryRegistry::with_defaults();
                self.save(&registry)?;
                tracing::info!(path = %self.path.display(), "created default categories");
                Ok(registry)
            }
        }
    }

    pub fn save(&self, registry: &CategoryRegistry) -> Result<(), PersistenceError> {
        let doc = CategoryDocument {
            categories: registry.as_slice().to_vec(),
        };
        write_json(&self.path, &doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn absent_file_is_seeded_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = CategoryStore::new(dir.path().join("categories.json"));
        let registry = store.load_or_create().unwrap();
        assert_eq!(registry, CategoryRegistry::with_defaults());
        assert!(store.path().exists());

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["categories"][0]["fee"], serde_json::json!(502.0));
        assert!(raw["categories"][3]["fee"].is_null());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = CategoryStore::new(dir.path().join("categories.json"));
        let registry = CategoryRegistry::new(vec![
            Category::fixed("Piano", dec!(502)),
            Category::fixed("Veena", dec!(1250.50)),
            Category::variable("Other"),
        ])
        .unwrap();
        store.save(&registry).unwrap();
        assert_eq!(store.load_or_create().unwrap(), registry);
    }

    #[test]
    fn hand_written_document_with_integer_fees() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(
            &path,
            r#"{"categories": [{"name": "Piano", "fee": 502}, {"name": "Gifts", "fee": null}]}"#,
        )
        .unwrap();
        let registry = CategoryStore::new(&path).load_or_create().unwrap();
        assert_eq!(registry.by_fee(dec!(502.00)).unwrap().name, "Piano");
        assert_eq!(registry.wildcard().unwrap().name, "Gifts");
    }

    #[test]
    fn conflicting_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(
            &path,
            r#"{"categories": [{"name": "A", "fee": 502}, {"name": "B", "fee": 502.0}]}"#,
        )
        .unwrap();
        let err = CategoryStore::new(&path).load_or_create().unwrap_err();
        assert!(matches!(err, PersistenceError::Validation { .. }));
    }
}
