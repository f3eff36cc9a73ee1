//! `config.toml` in the data directory. Every field is optional.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use feetrack_core::money::DEFAULT_CURRENCY_SYMBOL;
use feetrack_import::CollisionPolicy;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Relative paths are taken from the data directory.
    pub categories_file: PathBuf,
    pub names_file: PathBuf,
    pub edits_dir: PathBuf,
    pub currency_symbol: String,
    pub collision_policy: CollisionPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            categories_file: PathBuf::from("categories.json"),
            names_file: PathBuf::from("student_names.json"),
            edits_dir: PathBuf::from("edits"),
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            collision_policy: CollisionPolicy::default(),
        }
    }
}

impl TrackerConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read `<data_dir>/config.toml`, falling back to defaults when it is absent.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(s) => {
                let config = Self::from_toml(&s)?;
                tracing::debug!(path = %path.display(), "loaded config");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    pub fn categories_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.categories_file)
    }

    pub fn names_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.names_file)
    }

    pub fn edits_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.edits_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = TrackerConfig::from_toml(
            r#"
currency_symbol = "Rs."
collision_policy = "last-inserted"
"#,
        )
        .unwrap();
        assert_eq!(config.currency_symbol, "Rs.");
        assert_eq!(config.collision_policy, CollisionPolicy::LastInserted);
        assert_eq!(config.names_file, PathBuf::from("student_names.json"));
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(TrackerConfig::load(dir.path()).unwrap(), TrackerConfig::default());
    }

    #[test]
    fn paths_are_joined_to_data_dir() {
        let config = TrackerConfig {
            edits_dir: PathBuf::from("/elsewhere/edits"),
            ..TrackerConfig::default()
        };
        let data = Path::new("/data");
        assert_eq!(config.categories_path(data), PathBuf::from("/data/categories.json"));
        assert_eq!(config.edits_path(data), PathBuf::from("/elsewhere/edits"));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = TrackerConfig::from_toml("collision_policy = \"random\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
