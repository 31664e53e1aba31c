//! Templates command - inspect and manage stored templates.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use super::open_engine;

/// Arguments for the templates command.
#[derive(Args)]
pub struct TemplatesArgs {
    #[command(subcommand)]
    command: TemplatesCommand,
}

#[derive(Subcommand)]
enum TemplatesCommand {
    /// List stored templates
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: ListFormat,
    },

    /// Show one template as JSON
    Show {
        /// Template id
        template_id: String,
    },

    /// Remove one template
    Remove {
        /// Template id
        template_id: String,
    },

    /// Remove all templates
    Clear {
        /// Confirm the removal
        #[arg(long)]
        force: bool,
    },

    /// Export the template set to a file
    Export {
        /// Output path
        output: PathBuf,
    },

    /// Import templates from an exported file
    Import {
        /// Input path
        input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum ListFormat {
    /// Aligned table
    Table,
    /// JSON output
    Json,
    /// CSV output
    Csv,
}

pub async fn run(
    args: TemplatesArgs,
    config_path: Option<&str>,
    store_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let engine = open_engine(config_path, store_dir)?;

    match args.command {
        TemplatesCommand::List { format } => list(&engine, format),
        TemplatesCommand::Show { template_id } => show(&engine, &template_id),
        TemplatesCommand::Remove { template_id } => remove(&engine, &template_id),
        TemplatesCommand::Clear { force } => clear(&engine, force),
        TemplatesCommand::Export { output } => export(&engine, &output),
        TemplatesCommand::Import { input } => import(&engine, &input),
    }
}

fn list(engine: &qalib_core::TemplateEngine, format: ListFormat) -> anyhow::Result<()> {
    let templates = engine.list_templates();

    match format {
        ListFormat::Table => {
            if templates.is_empty() {
                println!("{} No templates stored", style("ℹ").blue());
                return Ok(());
            }
            println!(
                "{:<22} {:<28} {:>7} {:>10} {:<20}",
                "ID", "VENDOR", "SAMPLES", "CONFIDENCE", "UPDATED"
            );
            for template in &templates {
                println!(
                    "{:<22} {:<28} {:>7} {:>10.2} {:<20}",
                    template.template_id,
                    template.vendor_name,
                    template.sample_count,
                    template.confidence_score,
                    template.last_updated.format("%Y-%m-%d %H:%M:%S"),
                );
            }
        }
        ListFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&templates)?);
        }
        ListFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(vec![]);
            wtr.write_record([
                "template_id",
                "vendor_name",
                "vendor_tax_number",
                "sample_count",
                "confidence_score",
                "last_updated",
            ])?;
            for template in &templates {
                wtr.write_record([
                    &template.template_id,
                    &template.vendor_name,
                    &template.vendor_tax_number,
                    &template.sample_count.to_string(),
                    &template.confidence_score.to_string(),
                    &template.last_updated.to_rfc3339(),
                ])?;
            }
            print!("{}", String::from_utf8(wtr.into_inner()?)?);
        }
    }

    Ok(())
}

fn show(engine: &qalib_core::TemplateEngine, template_id: &str) -> anyhow::Result<()> {
    match engine.get_template(template_id) {
        Some(template) => {
            println!("{}", serde_json::to_string_pretty(&template)?);
            Ok(())
        }
        None => anyhow::bail!("Template not found: {}", template_id),
    }
}

fn remove(engine: &qalib_core::TemplateEngine, template_id: &str) -> anyhow::Result<()> {
    if engine.remove_template(template_id) {
        println!("{} Removed template {}", style("✓").green(), template_id);
        Ok(())
    } else {
        anyhow::bail!("Template not found: {}", template_id)
    }
}

fn clear(engine: &qalib_core::TemplateEngine, force: bool) -> anyhow::Result<()> {
    if !force {
        anyhow::bail!("Refusing to clear the template store without --force");
    }
    engine.clear();
    println!("{} Cleared all templates", style("✓").green());
    Ok(())
}

fn export(engine: &qalib_core::TemplateEngine, output: &Path) -> anyhow::Result<()> {
    let exported = engine.export(output)?;
    println!(
        "{} Exported {} templates to {}",
        style("✓").green(),
        exported,
        output.display()
    );
    Ok(())
}

fn import(engine: &qalib_core::TemplateEngine, input: &Path) -> anyhow::Result<()> {
    let merged = engine.import(input)?;
    println!(
        "{} Imported {} templates from {}",
        style("✓").green(),
        merged,
        input.display()
    );
    Ok(())
}
