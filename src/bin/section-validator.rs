//! # Section Validator
//!
//! Command-line tool for checking configuration section sources.
//! Reports which sections exist and the registrations each one declares,
//! without instantiating anything.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use section_settings::config::ConfigLoader;
use section_settings::configurator::{DefaultConfigurator, SectionSummary, TypeCatalog};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "section-validator")]
#[command(about = "Validate configuration section sources")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Section source file (TOML, YAML, JSON, ...)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Runtime settings file whose `sources.path` names the section source
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Sections to validate (default: every section in the source)
    sections: Vec<String>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    match run(&cli) {
        Ok(()) => {
            info!("Section validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Section validation failed: {:#}", e);
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let source = resolve_source(cli)?;
    let configurator = DefaultConfigurator::from_file(&source, TypeCatalog::new())
        .with_context(|| format!("Failed to read section source {}", source.display()))?;

    let sections = if cli.sections.is_empty() {
        configurator.section_names()
    } else {
        cli.sections.clone()
    };

    let mut summaries = Vec::with_capacity(sections.len());
    let mut failures = Vec::new();
    for section in &sections {
        match configurator.describe(section) {
            Ok(summary) => summaries.push(summary),
            Err(e) => failures.push((section.clone(), e.to_string())),
        }
    }

    match cli.format {
        OutputFormat::Table => print_table(&source, &summaries, &failures),
        OutputFormat::Json => print_json(&summaries, &failures)?,
    }

    if !failures.is_empty() {
        bail!("{} of {} sections are invalid", failures.len(), sections.len());
    }
    Ok(())
}

fn resolve_source(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.config {
        return Ok(path.clone());
    }

    let settings = ConfigLoader::new()
        .load(cli.settings.as_deref())
        .context("Failed to load runtime settings")?;
    settings.log_configuration();

    settings
        .sources
        .path
        .context("No section source given: pass --config or set sources.path")
}

fn print_table(source: &std::path::Path, summaries: &[SectionSummary], failures: &[(String, String)]) {
    println!("🔧 Validating configuration sections");
    println!("Source: {}", source.display());
    println!();

    for summary in summaries {
        println!(
            "✅ {} ({} registrations)",
            summary.section,
            summary.registrations.len()
        );
        for registration in &summary.registrations {
            println!(
                "   - {:<24} {}",
                registration.type_alias,
                registration.name.as_deref().unwrap_or("<default>")
            );
        }
    }

    for (section, reason) in failures {
        println!("❌ {section}: {reason}");
    }
}

fn print_json(summaries: &[SectionSummary], failures: &[(String, String)]) -> Result<()> {
    let failures: Vec<_> = failures
        .iter()
        .map(|(section, reason)| serde_json::json!({ "section": section, "error": reason }))
        .collect();
    let report = serde_json::json!({
        "valid": summaries,
        "invalid": failures,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
