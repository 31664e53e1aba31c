//! Persistent keyed store of per-vendor templates.
//!
//! The full template set lives in one `templates.json` per store directory.
//! Loading degrades to an empty store on missing or corrupt state; saving
//! writes a temp file and renames it over the durable one, so a failed save
//! never corrupts previously persisted templates.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::models::template::InvoiceTemplate;

const STORE_FILE: &str = "templates.json";

/// Persistent collection of per-vendor templates with a capacity bound.
pub struct TemplateStore {
    dir: PathBuf,
    max_templates: usize,
    templates: HashMap<String, InvoiceTemplate>,
}

impl TemplateStore {
    /// Open a store bound to `dir`, loading any persisted templates.
    /// Missing or corrupt persisted state starts the store empty.
    pub fn open(dir: impl Into<PathBuf>, max_templates: usize) -> Self {
        let mut store = Self {
            dir: dir.into(),
            max_templates,
            templates: HashMap::new(),
        };
        store.load();
        store
    }

    /// Path of the durable template file.
    pub fn store_path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    fn load(&mut self) {
        let path = self.store_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no persisted templates at {}", path.display());
                return;
            }
            Err(e) => {
                warn!(
                    "failed to read template store at {}: {}, starting empty",
                    path.display(),
                    e
                );
                return;
            }
        };

        match serde_json::from_str::<BTreeMap<String, InvoiceTemplate>>(&content) {
            Ok(templates) => {
                self.templates = templates.into_iter().collect();
                info!(
                    "loaded {} templates from {}",
                    self.templates.len(),
                    path.display()
                );
            }
            Err(e) => {
                warn!(
                    "corrupt template store at {}: {}, starting empty",
                    path.display(),
                    e
                );
            }
        }
    }

    /// Persist the full template set. Writes to a temp file and renames it
    /// over the durable one.
    pub fn save(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::Write {
            path: self.dir.clone(),
            source: e,
        })?;

        let path = self.store_path();
        let tmp = self.dir.join(format!("{STORE_FILE}.tmp"));
        let content = serde_json::to_string_pretty(&self.sorted())?;

        fs::write(&tmp, content).map_err(|e| StoreError::Write {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::Write {
            path: path.clone(),
            source: e,
        })?;

        debug!(
            "persisted {} templates to {}",
            self.templates.len(),
            path.display()
        );
        Ok(())
    }

    /// Get a template by id.
    pub fn get(&self, template_id: &str) -> Option<&InvoiceTemplate> {
        self.templates.get(template_id)
    }

    /// Insert or replace a template, evicting the least-recently-updated
    /// templates while over capacity.
    pub fn put(&mut self, template: InvoiceTemplate) {
        self.templates
            .insert(template.template_id.clone(), template);
        self.evict_excess();
    }

    /// Remove a template by id. Returns whether it existed.
    pub fn remove(&mut self, template_id: &str) -> bool {
        self.templates.remove(template_id).is_some()
    }

    /// All templates, ordered by id for deterministic iteration.
    pub fn list(&self) -> Vec<&InvoiceTemplate> {
        let mut templates: Vec<&InvoiceTemplate> = self.templates.values().collect();
        templates.sort_by(|a, b| a.template_id.cmp(&b.template_id));
        templates
    }

    /// Remove all templates.
    pub fn clear(&mut self) {
        self.templates.clear();
    }

    /// Number of stored templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Write the template set to an arbitrary path in the persisted shape.
    pub fn export(&self, path: &Path) -> Result<usize, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::Write {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let content = serde_json::to_string_pretty(&self.sorted())?;
        fs::write(path, content).map_err(|e| StoreError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(self.templates.len())
    }

    /// Merge templates from an exported file. Per template id, the record
    /// with the higher sample count wins. Returns how many were merged in.
    pub fn import(&mut self, path: &Path) -> Result<usize, StoreError> {
        let content = fs::read_to_string(path).map_err(|e| StoreError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let incoming: BTreeMap<String, InvoiceTemplate> = serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut merged = 0;
        for (template_id, template) in incoming {
            let accept = match self.templates.get(&template_id) {
                Some(existing) => template.sample_count > existing.sample_count,
                None => true,
            };
            if accept {
                self.templates.insert(template_id, template);
                merged += 1;
            }
        }

        self.evict_excess();
        info!("imported {} templates from {}", merged, path.display());
        Ok(merged)
    }

    fn evict_excess(&mut self) {
        while self.templates.len() > self.max_templates {
            let oldest = self
                .templates
                .values()
                .min_by_key(|t| t.last_updated)
                .map(|t| t.template_id.clone());
            match oldest {
                Some(template_id) => {
                    warn!("template store over capacity, evicting {}", template_id);
                    self.templates.remove(&template_id);
                }
                None => break,
            }
        }
    }

    fn sorted(&self) -> BTreeMap<&String, &InvoiceTemplate> {
        self.templates.iter().collect()
    }
}
