use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use feetrack_core::NameRegistry;

use crate::store::{read_json, write_json, PersistenceError};

pub const TEMPLATE_COMMENT: &str =
    "Maps short names as they appear in bank statement descriptions to full display names.";
pub const TEMPLATE_INSTRUCTIONS: &str =
    "Add one \"SHORT NAME\": \"Full Name\" pair per payer. Keys are matched exactly first, \
     then ignoring case, then ignoring spaces, then ignoring both.";

const TEMPLATE_MAPPINGS: &[(&str, &str)] = &[
    ("JOHND", "John Doe"),
    ("SUNDARA P", "Sundara Pandian"),
    ("MRS GEETH", "Mrs Geetha Ramachandran"),
];

#[derive(Debug, Serialize, Deserialize)]
struct NameDocument {
    mappings: Map<String, Value>,
    #[serde(rename = "_comment", default)]
    comment: String,
    #[serde(rename = "_instructions", default)]
    instructions: String,
}

/// `{"mappings": {...}, "_comment": ..., "_instructions": ...}` on disk.
/// The two documentation fields are carried through saves untouched.
#[derive(Debug, Clone)]
pub struct NameStore {
    path: PathBuf,
    comment: String,
    instructions: String,
}

impl NameStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            comment: TEMPLATE_COMMENT.to_string(),
            instructions: TEMPLATE_INSTRUCTIONS.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry, writing the illustrative template if the file is absent.
    pub fn load_or_create(&mut self) -> Result<NameRegistry, PersistenceError> {
        let Some(doc) = read_json::<NameDocument>(&self.path)? else {
            let registry = NameRegistry::from_pairs(TEMPLATE_MAPPINGS.iter().copied()).map_err(|source| {
                PersistenceError::Validation {
                    path: self.path.clone(),
                    source,
                }
            })?;
            self.save(&registry)?;
            tracing::info!(path = %self.path.display(), "created name mapping template");
            return Ok(registry);
        };

        let mut registry = NameRegistry::new();
        for (short, full) in doc.mappings {
            let Value::String(full) = full else {
                return Err(PersistenceError::Invalid {
                    path: self.path.clone(),
                    message: format!("mapping for '{short}' is not a string"),
                });
            };
            registry
                .add(short, full)
                .map_err(|source| PersistenceError::Validation {
                    path: self.path.clone(),
                    source,
                })?;
        }
        if !doc.comment.is_empty() {
            self.comment = doc.comment;
        }
        if !doc.instructions.is_empty() {
            self.instructions = doc.instructions;
        }
        tracing::info!(count = registry.len(), path = %self.path.display(), "loaded name mappings");
        Ok(registry)
    }

    pub fn save(&self, registry: &NameRegistry) -> Result<(), PersistenceError> {
        let mappings = registry
            .iter()
            .map(|m| (m.short_name.clone(), Value::String(m.full_name.clone())))
            .collect();
        let doc = NameDocument {
            mappings,
            comment: self.comment.clone(),
            instructions: self.instructions.clone(),
        };
        write_json(&self.path, &doc)
    }
}
