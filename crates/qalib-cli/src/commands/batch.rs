//! Batch command - learn templates from many extraction results.

use std::path::Path;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use super::{open_engine, read_observation};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for extraction result JSON files
    #[arg(required = true)]
    pattern: String,
}

pub async fn run(
    args: BatchArgs,
    config_path: Option<&str>,
    store_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let paths: Vec<_> = glob::glob(&args.pattern)?
        .filter_map(|entry| entry.ok())
        .collect();

    if paths.is_empty() {
        anyhow::bail!("No files match pattern: {}", args.pattern);
    }

    let engine = open_engine(config_path, store_dir)?;

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );

    let mut learned = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for path in &paths {
        pb.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        );

        match read_observation(path) {
            Ok(observation) => match engine.learn(&observation) {
                Some(_) => learned += 1,
                None => skipped += 1,
            },
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                failed += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message("Done");

    println!();
    println!("{} Learned from {} observations", style("✓").green(), learned);
    if skipped > 0 {
        println!(
            "{} {} observations had no vendor tax number",
            style("ℹ").blue(),
            skipped
        );
    }
    if failed > 0 {
        println!("{} {} files could not be read", style("⚠").yellow(), failed);
    }

    Ok(())
}
