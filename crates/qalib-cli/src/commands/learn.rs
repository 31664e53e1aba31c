//! Learn command - update a vendor template from one extraction result.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;

use super::{open_engine, read_observation};

/// Arguments for the learn command.
#[derive(Args)]
pub struct LearnArgs {
    /// Extraction result JSON file
    #[arg(required = true)]
    input: PathBuf,
}

pub async fn run(
    args: LearnArgs,
    config_path: Option<&str>,
    store_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let engine = open_engine(config_path, store_dir)?;
    let observation = read_observation(&args.input)?;

    match engine.learn(&observation) {
        Some(template_id) => {
            println!("{} Learned template {}", style("✓").green(), template_id);
            if let Some(template) = engine.get_template(&template_id) {
                println!("  vendor:     {}", template.vendor_name);
                println!("  samples:    {}", template.sample_count);
                println!("  fields:     {}", template.fields.len());
                println!("  confidence: {:.2}", template.confidence_score);
            }
        }
        None => {
            println!(
                "{} Observation has no vendor tax number, nothing learned",
                style("ℹ").blue()
            );
        }
    }

    Ok(())
}
