//! Stats command - aggregate statistics over the stored templates.

use std::path::Path;

use clap::Args;
use console::style;

use super::open_engine;

/// Arguments for the stats command.
#[derive(Args)]
pub struct StatsArgs {
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
    args: StatsArgs,
    config_path: Option<&str>,
    store_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let engine = open_engine(config_path, store_dir)?;
    let stats = engine.template_stats();

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Text => {
            println!("{}", style("Template store").bold());
            println!("  templates:       {}", stats.count);
            println!("  total samples:   {}", stats.total_samples);
            println!("  avg samples:     {:.1}", stats.avg_samples_per_template);
            println!("  avg confidence:  {:.2}", stats.avg_confidence);
            println!("  reliable:        {}", stats.reliable_templates);
        }
    }

    Ok(())
}
