//! Engine facade: the surface exposed to the extraction pipeline.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::config::QalibConfig;
use crate::models::observation::{DocumentObservation, TextBlock};
use crate::models::template::InvoiceTemplate;
use super::builder::TemplateBuilder;
use super::hints::{HintGenerator, RegionHint};
use super::matcher::{TemplateMatch, TemplateMatcher};
use super::store::TemplateStore;

/// Aggregate statistics over the stored templates.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateStats {
    /// Number of stored templates.
    pub count: usize,

    /// Sum of sample counts across templates.
    pub total_samples: u64,

    /// Mean samples per template.
    pub avg_samples_per_template: f32,

    /// Mean template confidence.
    pub avg_confidence: f32,

    /// Templates with at least 3 samples.
    pub reliable_templates: usize,
}

/// The template learning and matching engine.
///
/// Reads (matching, hints, stats) take a shared lock and never block each
/// other; learning and store mutation take the exclusive lock, so two
/// concurrent observations of the same vendor cannot interleave the
/// region-averaging arithmetic.
pub struct TemplateEngine {
    store: RwLock<TemplateStore>,
    builder: TemplateBuilder,
    matcher: TemplateMatcher,
    hints: HintGenerator,
    auto_persist: bool,
}

impl TemplateEngine {
    /// Open an engine over the configured store directory. Missing or
    /// corrupt persisted state starts the engine empty, never fails.
    pub fn new(config: &QalibConfig) -> Self {
        let store = TemplateStore::open(&config.store.store_dir, config.store.max_templates);
        Self {
            store: RwLock::new(store),
            builder: TemplateBuilder::new(),
            matcher: TemplateMatcher::new(config.matching.clone()),
            hints: HintGenerator::new().with_max_candidates(config.matching.max_hint_candidates),
            auto_persist: config.store.auto_persist,
        }
    }

    /// Learn from one observation. Returns the template id, or `None` when
    /// the observation carries no vendor tax number.
    pub fn learn(&self, observation: &DocumentObservation) -> Option<String> {
        let mut store = self.write_store();
        let template_id = self.builder.learn(&mut store, observation)?;
        if self.auto_persist {
            Self::flush(&store);
        }
        Some(template_id)
    }

    /// Find the best template for an observation.
    pub fn find_matching_template(&self, observation: &DocumentObservation) -> TemplateMatch {
        self.matcher.find(&self.read_store(), observation)
    }

    /// Resolve a stored template's regions against OCR text blocks.
    /// Returns `None` for an unknown template id.
    pub fn apply_template(
        &self,
        blocks: &[TextBlock],
        template_id: &str,
    ) -> Option<HashMap<String, RegionHint>> {
        let store = self.read_store();
        let template = store.get(template_id)?;
        Some(self.hints.apply(blocks, template))
    }

    /// Aggregate statistics over the stored templates.
    pub fn template_stats(&self) -> TemplateStats {
        let store = self.read_store();
        let templates = store.list();
        let count = templates.len();
        let total_samples: u64 = templates.iter().map(|t| t.sample_count as u64).sum();
        let total_confidence: f32 = templates.iter().map(|t| t.confidence_score).sum();
        let reliable_templates = templates.iter().filter(|t| t.is_reliable()).count();

        TemplateStats {
            count,
            total_samples,
            avg_samples_per_template: if count > 0 {
                total_samples as f32 / count as f32
            } else {
                0.0
            },
            avg_confidence: if count > 0 {
                total_confidence / count as f32
            } else {
                0.0
            },
            reliable_templates,
        }
    }

    /// Get a template by id.
    pub fn get_template(&self, template_id: &str) -> Option<InvoiceTemplate> {
        self.read_store().get(template_id).cloned()
    }

    /// All templates, ordered by id.
    pub fn list_templates(&self) -> Vec<InvoiceTemplate> {
        self.read_store().list().into_iter().cloned().collect()
    }

    /// Remove a template by id. Returns whether it existed.
    pub fn remove_template(&self, template_id: &str) -> bool {
        let mut store = self.write_store();
        let removed = store.remove(template_id);
        if removed && self.auto_persist {
            Self::flush(&store);
        }
        removed
    }

    /// Remove all templates.
    pub fn clear(&self) {
        let mut store = self.write_store();
        store.clear();
        if self.auto_persist {
            Self::flush(&store);
        }
    }

    /// Persist the store now.
    pub fn save(&self) -> Result<()> {
        self.read_store().save()?;
        Ok(())
    }

    /// Write the template set to an arbitrary path.
    pub fn export(&self, path: &Path) -> Result<usize> {
        let exported = self.read_store().export(path)?;
        Ok(exported)
    }

    /// Merge templates from an exported file; higher sample count wins per
    /// template id. Returns how many were merged in.
    pub fn import(&self, path: &Path) -> Result<usize> {
        let mut store = self.write_store();
        let merged = store.import(path)?;
        if self.auto_persist {
            Self::flush(&store);
        }
        Ok(merged)
    }

    /// Save failures on the learn path are logged, never surfaced: the
    /// in-memory state stays intact and serves lookups.
    fn flush(store: &TemplateStore) {
        if let Err(e) = store.save() {
            warn!("failed to persist template store: {}", e);
        } else {
            debug!("template store persisted");
        }
    }

    fn read_store(&self) -> RwLockReadGuard<'_, TemplateStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, TemplateStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}
