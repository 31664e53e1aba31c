//! Configuration structures for the template engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration for the qalib engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QalibConfig {
    /// Template store configuration.
    pub store: StoreConfig,

    /// Matching configuration.
    pub matching: MatchingConfig,
}

/// Template store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the persisted template set.
    pub store_dir: PathBuf,

    /// Maximum number of templates before least-recently-updated eviction.
    pub max_templates: usize,

    /// Persist the store after every learn.
    pub auto_persist: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("templates"),
            max_templates: 1000,
            auto_persist: true,
        }
    }
}

/// Fuzzy matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum fuzzy score to accept a match.
    pub accept_threshold: f32,

    /// Weight of vendor name similarity.
    pub name_weight: f32,

    /// Weight of the field overlap ratio.
    pub field_weight: f32,

    /// Weight of the document type match.
    pub document_type_weight: f32,

    /// Maximum candidate texts per field hint.
    pub max_hint_candidates: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.5,
            name_weight: 0.4,
            field_weight: 0.4,
            document_type_weight: 0.2,
            max_hint_candidates: 5,
        }
    }
}

impl QalibConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}
