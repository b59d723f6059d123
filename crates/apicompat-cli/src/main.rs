use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use apicompat_core::{ApiDiff, Components, Config, Report, SchemaRef, Severity};
use apicompat_engine::{catalog, Checker, Sources};

/// apicompat - breaking change detection for OpenAPI documents
#[derive(Parser)]
#[command(name = "apicompat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: apicompat.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the changes of a structural API diff
    Check {
        /// Path to the diff (JSON)
        diff: PathBuf,

        /// Operation source positions (JSON)
        #[arg(short, long)]
        sources: Option<PathBuf>,

        /// Output file for report.json
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Evaluate sunset dates against this day (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Flatten allOf compositions of a schema and its components
    Flatten {
        /// JSON document with `schema` and optional `components`
        input: PathBuf,
    },

    /// List the change catalogue
    Rules {
        /// Only list changes that are breaking by default
        #[arg(short, long)]
        breaking: bool,
    },
}

/// Input of the flatten command
#[derive(Deserialize)]
struct FlattenInput {
    schema: SchemaRef,

    #[serde(default)]
    components: Components,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Check {
            diff,
            sources,
            output,
            today,
        } => check_command(config, &diff, sources.as_deref(), &output, today, cli.verbose),
        Commands::Flatten { input } => flatten_command(&input),
        Commands::Rules { breaking } => rules_command(breaking),
    }
}

/// Log to stderr; `RUST_LOG` wins over the verbosity flag
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let default_path = Path::new("apicompat.toml");

    let path = match path {
        Some(path) => path,
        None if default_path.exists() => default_path,
        None => {
            if verbose {
                eprintln!("{}", "No config file found, using defaults".yellow());
            }
            return Ok(Config::default());
        }
    };

    Config::from_file(path).with_context(|| format!("Failed to load config {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Check command - classify every change and write the report
fn check_command(
    mut config: Config,
    diff_path: &Path,
    sources_path: Option<&Path>,
    output: &Path,
    today: Option<NaiveDate>,
    verbose: bool,
) -> Result<()> {
    if today.is_some() {
        config.today = today;
    }

    let checker = Checker::new(config).context("Invalid configuration")?;

    if verbose {
        eprintln!("{} {}", "Loading diff from:".cyan(), diff_path.display());
    }
    let diff: ApiDiff = read_json(diff_path)?;

    let sources = match sources_path {
        Some(path) => read_json(path)?,
        None => Sources::new(),
    };

    let report = checker.report(&diff, &sources);
    tracing::debug!(
        total = report.summary.total,
        errors = report.summary.errors,
        "check finished"
    );

    report
        .save_to_file(output)
        .with_context(|| format!("Failed to write report {}", output.display()))?;

    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    print_report_summary(&checker, &report);

    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

/// Flatten command - print the flattened schema graph as JSON
fn flatten_command(input_path: &Path) -> Result<()> {
    let input: FlattenInput = read_json(input_path)?;

    let flattened = apicompat_merge::merge(&input.schema, &input.components)
        .with_context(|| format!("Failed to flatten {}", input_path.display()))?;

    let output = serde_json::json!({
        "schema": flattened.schema,
        "components": { "schemas": flattened.components },
        "circularRefs": flattened.circular_refs,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Rules command - print the catalogue
fn rules_command(breaking: bool) -> Result<()> {
    catalog::validate().context("Change catalogue is inconsistent")?;

    for entry in catalog::entries() {
        if breaking && !entry.level.is_breaking() {
            continue;
        }
        println!("{:<7} {:<48} {}", severity_label(entry.level), entry.id, entry.template);
    }

    Ok(())
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warn => "WARN".yellow().bold(),
        Severity::Info => "INFO".cyan(),
    }
}

fn print_report_summary(checker: &Checker, report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "API Compatibility Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    println!("{}", "Summary:".bold());
    println!("  Total changes: {}", report.summary.total);
    println!("  Operations:    {}", report.summary.operations_affected);

    if report.summary.errors > 0 {
        println!("  Errors:   {}", format!("{}", report.summary.errors).red().bold());
    } else {
        println!("  Errors:   {}", format!("{}", report.summary.errors).green());
    }

    if report.summary.warnings > 0 {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).yellow());
    } else {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).green());
    }

    println!("  Info:     {}", report.summary.info);
    println!();

    if report.changes.is_empty() {
        println!("{}", "✓ No changes found!".green().bold());
    } else {
        println!("{}", "Changes:".bold());
        for change in &report.changes {
            println!(
                "  [{}] {} {} {}: {}",
                severity_label(change.severity),
                change.operation,
                change.path,
                change.id,
                checker.message(change)
            );

            if let Some(location) = &change.revision_source {
                println!("    at {}", location);
            } else if let Some(location) = &change.base_source {
                println!("    at {} (base)", location);
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}
