//! Match command - resolve an extraction result to a learned template.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;

use super::{open_engine, read_observation};

/// Arguments for the match command.
#[derive(Args)]
pub struct MatchArgs {
    /// Extraction result JSON file
    #[arg(required = true)]
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(
    args: MatchArgs,
    config_path: Option<&str>,
    store_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let engine = open_engine(config_path, store_dir)?;
    let observation = read_observation(&args.input)?;

    let result = engine.find_matching_template(&observation);

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => match &result.template {
            Some(template) => {
                println!("{} Matched template {}", style("✓").green(), template.template_id);
                println!("  vendor:     {}", template.vendor_name);
                println!("  score:      {:.3}", result.match_score);
                println!("  boost:      {:.4}", result.confidence_boost);
                println!("  matched:    {}", result.matched_fields.join(", "));
            }
            None => {
                println!("{} No matching template", style("ℹ").blue());
            }
        },
    }

    Ok(())
}
