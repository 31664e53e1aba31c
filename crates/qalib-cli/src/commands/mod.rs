//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod learn;
pub mod matching;
pub mod stats;
pub mod templates;

use std::path::Path;

use qalib_core::{DocumentObservation, QalibConfig, TemplateEngine};

/// Load configuration, apply overrides, and open the engine over it.
pub fn open_engine(
    config_path: Option<&str>,
    store_dir: Option<&Path>,
) -> anyhow::Result<TemplateEngine> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = store_dir {
        config.store.store_dir = dir.to_path_buf();
    }
    Ok(TemplateEngine::new(&config))
}

/// Load configuration from an explicit path, the default location, or
/// defaults when no file exists.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<QalibConfig> {
    match config_path {
        Some(path) => Ok(QalibConfig::from_file(Path::new(path))?),
        None => {
            let default_path = config::default_config_path();
            if default_path.exists() {
                Ok(QalibConfig::from_file(&default_path)?)
            } else {
                Ok(QalibConfig::default())
            }
        }
    }
}

/// Read a structured observation from a JSON file.
pub fn read_observation(path: &Path) -> anyhow::Result<DocumentObservation> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("invalid observation in {}: {}", path.display(), e))
}
