//! Sumi-Mirror main entry point
//!
//! This is the command-line interface for the Sumi-Mirror website mirroring engine.

use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_mirror::config::{load_config_with_hash, Config};
use sumi_mirror::output::{generate_markdown_summary, print_statistics};
use sumi_mirror::Mirror;
use tracing_subscriber::EnvFilter;

/// Sumi-Mirror: a website mirroring engine
///
/// Sumi-Mirror downloads seed pages together with the stylesheets, images
/// and other resources they reference, rewrites every reference to point at
/// the local copy, and writes the result to a fresh directory.
#[derive(Parser, Debug)]
#[command(name = "sumi-mirror")]
#[command(version = "1.0.0")]
#[command(about = "A website mirroring engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be mirrored without fetching anything
    #[arg(long, conflicts_with = "report")]
    dry_run: bool,

    /// Write a markdown summary of the run to this file
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Keep going when a resource fails instead of rolling back
    #[arg(long)]
    ignore_errors: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.ignore_errors {
        config.crawler.ignore_errors = true;
    }

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else {
        handle_mirror(config, config_hash, cli.report.as_deref()).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_mirror=info,warn"),
            1 => EnvFilter::new("sumi_mirror=debug,info"),
            2 => EnvFilter::new("sumi_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be mirrored
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    sumi_mirror::config::validate(config)?;

    println!("=== Sumi-Mirror Dry Run ===\n");

    println!("Output:");
    println!("  Directory: {}", config.output.directory.display());
    println!("  Default filename: {}", config.output.default_filename);
    println!("  Filename generator: {:?}", config.output.filename_generator);
    println!("  Prettify URLs: {}", config.output.prettify_urls);
    for rule in &config.output.subdirectories {
        println!("  {}/ <- {}", rule.directory, rule.extensions.join(", "));
    }

    println!("\nCrawler Configuration:");
    let limit = |value: Option<u32>| value.map_or("unlimited".to_string(), |v| v.to_string());
    println!("  Max depth: {}", limit(config.crawler.max_depth));
    println!(
        "  Max recursive depth: {}",
        limit(config.crawler.max_recursive_depth)
    );
    println!("  Recursive: {}", config.crawler.recursive);
    println!(
        "  Request concurrency: {}",
        config
            .crawler
            .request_concurrency
            .map_or("unlimited".to_string(), |v| v.to_string())
    );
    println!("  Root concurrency: {}", config.crawler.root_concurrency);
    println!("  Ignore errors: {}", config.crawler.ignore_errors);
    println!(
        "  Update missing sources: {:?}",
        config.crawler.update_missing_sources
    );
    if !config.crawler.url_filter.is_empty() {
        println!("  URL filter: {}", config.crawler.url_filter.join(", "));
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nSource Rules ({}):", config.active_sources().len());
    for active in config.active_sources() {
        let location = active.rule.attr.as_deref().unwrap_or("(text)");
        let marker = if active.recursive { " [recursive]" } else { "" };
        println!("  - {} -> {}{}", active.rule.selector, location, marker);
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        match seed.filename() {
            Some(filename) => println!("  - {} (as {})", seed.url(), filename),
            None => println!("  - {}", seed.url()),
        }
    }

    println!("\n✓ Configuration is valid");
    if config.output.directory.exists() {
        println!(
            "✗ Output directory {} already exists; the mirror would fail",
            config.output.directory.display()
        );
    }

    Ok(())
}

/// Handles the main mirror operation
async fn handle_mirror(
    config: Config,
    config_hash: String,
    report: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Mirroring {} seed(s) into {}",
        config.seeds.len(),
        config.output.directory.display()
    );

    let mirror = Mirror::builder(config).config_hash(config_hash).build()?;

    match mirror.scrape_with_summary().await {
        Ok(summary) => {
            tracing::info!(
                "Mirror completed in {} seconds",
                summary.duration_seconds()
            );
            if let Some(path) = report {
                generate_markdown_summary(&summary, path)?;
                tracing::info!("Summary written to: {}", path.display());
            }
            if !summary.statistics.resources_by_status.is_empty() {
                print_statistics(&summary.statistics);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Mirror failed: {}", e);
            Err(e.into())
        }
    }
}
