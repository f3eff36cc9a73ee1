use serde::{Deserialize, Serialize};

use crate::error::{NotFoundError, RegistryError, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMapping {
    pub short_name: String,
    pub full_name: String,
}

/// Short name → full display name, kept in insertion order so that lookups
/// which can match several keys are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameRegistry {
    entries: Vec<NameMapping>,
}

impl NameRegistry {
    pub fn new() -> Self {
        NameRegistry::default()
    }

    /// Build from `(short, full)` pairs. A repeated key fails.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut registry = NameRegistry::new();
        for (short, full) in pairs {
            registry.add(short, full)?;
        }
        Ok(registry)
    }

    pub fn add(
        &mut self,
        short_name: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Result<(), ValidationError> {
        let short_name = short_name.into();
        let full_name = full_name.into();
        validate(&short_name, &full_name)?;
        if self.get(&short_name).is_some() {
            return Err(ValidationError::DuplicateShortName(short_name));
        }
        self.entries.push(NameMapping {
            short_name,
            full_name,
        });
        Ok(())
    }

    /// Change the display name mapped to `short_name`.
    pub fn edit(&mut self, short_name: &str, full_name: impl Into<String>) -> Result<(), RegistryError> {
        let full_name = full_name.into();
        validate(short_name, &full_name)?;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.short_name == short_name)
            .ok_or_else(|| NotFoundError::ShortName(short_name.to_string()))?;
        entry.full_name = full_name;
        Ok(())
    }

    /// Re-key an entry in place, keeping its position.
    pub fn rename(&mut self, short_name: &str, new_short_name: impl Into<String>) -> Result<(), RegistryError> {
        let new_short_name = new_short_name.into();
        let idx = self
            .position(short_name)
            .ok_or_else(|| NotFoundError::ShortName(short_name.to_string()))?;
        validate(&new_short_name, &self.entries[idx].full_name)?;
        if new_short_name != short_name && self.get(&new_short_name).is_some() {
            return Err(ValidationError::DuplicateShortName(new_short_name).into());
        }
        self.entries[idx].short_name = new_short_name;
        Ok(())
    }

    pub fn remove(&mut self, short_name: &str) -> Result<NameMapping, NotFoundError> {
        let idx = self
            .position(short_name)
            .ok_or_else(|| NotFoundError::ShortName(short_name.to_string()))?;
        Ok(self.entries.remove(idx))
    }

    /// Insert or overwrite. Returns the previous display name, if any.
    pub fn upsert(
        &mut self,
        short_name: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Result<Option<String>, ValidationError> {
        let short_name = short_name.into();
        let full_name = full_name.into();
        validate(&short_name, &full_name)?;
        match self.entries.iter_mut().find(|e| e.short_name == short_name) {
            Some(entry) => Ok(Some(std::mem::replace(&mut entry.full_name, full_name))),
            None => {
                self.entries.push(NameMapping {
                    short_name,
                    full_name,
                });
                Ok(None)
            }
        }
    }

    /// Byte-for-byte key lookup.
    pub fn get(&self, short_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.short_name == short_name)
            .map(|e| e.full_name.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &NameMapping> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, short_name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.short_name == short_name)
    }
}

fn validate(short_name: &str, full_name: &str) -> Result<(), ValidationError> {
    if short_name.trim().is_empty() {
        return Err(ValidationError::Empty("Short name"));
    }
    if full_name.trim().is_empty() {
        return Err(ValidationError::Empty("Full name"));
    }
    for (field, value) in [("Short name", short_name), ("Full name", full_name)] {
        if !is_canonical(value) {
            return Err(ValidationError::NotCanonical {
                field,
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

/// A value survives export and re-import unchanged: no surrounding
/// whitespace and no `"…"` or `="…"` cell wrapper.
fn is_canonical(value: &str) -> bool {
    let wrapped = |inner: &str| inner.len() >= 2 && inner.starts_with('"') && inner.ends_with('"');
    value.trim() == value && !wrapped(value) && !value.strip_prefix('=').is_some_and(wrapped)
}
