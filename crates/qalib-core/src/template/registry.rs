//! Explicit registry of template engines keyed by profile.
//!
//! Replaces implicit process-wide engine caching with defined creation and
//! teardown: engines are created on demand per profile (e.g. one per
//! language), and removal flushes the underlying store first.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::models::config::QalibConfig;
use super::engine::TemplateEngine;

/// Profile-keyed registry of shared template engines.
pub struct EngineRegistry {
    engines: RwLock<HashMap<String, Arc<TemplateEngine>>>,
}

impl EngineRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            engines: RwLock::new(HashMap::new()),
        }
    }

    /// Get the engine for a profile, if one was created.
    pub fn get(&self, profile: &str) -> Option<Arc<TemplateEngine>> {
        self.engines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(profile)
            .cloned()
    }

    /// Get the engine for a profile, creating it from `config` on first use.
    pub fn get_or_create(&self, profile: &str, config: &QalibConfig) -> Arc<TemplateEngine> {
        if let Some(engine) = self.get(profile) {
            return engine;
        }

        let mut engines = self.engines.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have created it between the two locks.
        if let Some(engine) = engines.get(profile) {
            return Arc::clone(engine);
        }

        debug!("creating template engine for profile '{}'", profile);
        let engine = Arc::new(TemplateEngine::new(config));
        engines.insert(profile.to_string(), Arc::clone(&engine));
        engine
    }

    /// Tear down the engine for a profile, flushing its store first.
    /// Returns whether the profile existed.
    pub fn remove(&self, profile: &str) -> bool {
        let removed = self
            .engines
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(profile);

        match removed {
            Some(engine) => {
                if let Err(e) = engine.save() {
                    warn!("failed to flush engine for profile '{}': {}", profile, e);
                }
                true
            }
            None => false,
        }
    }

    /// Tear down all engines, flushing each store.
    pub fn shutdown(&self) {
        let engines: Vec<(String, Arc<TemplateEngine>)> = self
            .engines
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        for (profile, engine) in engines {
            if let Err(e) = engine.save() {
                warn!("failed to flush engine for profile '{}': {}", profile, e);
            }
        }
    }

    /// Registered profile keys, sorted.
    pub fn profiles(&self) -> Vec<String> {
        let mut profiles: Vec<String> = self
            .engines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        profiles.sort();
        profiles
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::StoreConfig;

    fn config(dir: &std::path::Path) -> QalibConfig {
        QalibConfig {
            store: StoreConfig {
                store_dir: dir.to_path_buf(),
                max_templates: 100,
                auto_persist: false,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_get_or_create_reuses_engine() {
        let dir = tempfile::tempdir().unwrap();
        let registry = EngineRegistry::new();

        let a = registry.get_or_create("en", &config(dir.path()));
        let b = registry.get_or_create("en", &config(dir.path()));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.profiles(), vec!["en".to_string()]);
    }

    #[test]
    fn test_profiles_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let registry = EngineRegistry::new();

        let en = registry.get_or_create("en", &config(&dir.path().join("en")));
        let ar = registry.get_or_create("ar", &config(&dir.path().join("ar")));
        assert!(!Arc::ptr_eq(&en, &ar));
        assert_eq!(registry.profiles(), vec!["ar".to_string(), "en".to_string()]);
    }

    #[test]
    fn test_remove_flushes_and_forgets() {
        let dir = tempfile::tempdir().unwrap();
        let registry = EngineRegistry::new();

        registry.get_or_create("en", &config(dir.path()));
        assert!(registry.remove("en"));
        assert!(!registry.remove("en"));
        assert!(registry.get("en").is_none());
        // Flush on teardown persists the (empty) store file.
        assert!(dir.path().join("templates.json").exists());
    }
}
