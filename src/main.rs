//! Listing-Ripple main entry point
//!
//! This is the command-line interface for the Listing-Ripple scraper.

use anyhow::Context;
use clap::Parser;
use listing_ripple::config::{load_config_with_hash, Config};
use listing_ripple::crawler::CrawlScheduler;
use listing_ripple::output::{dedupe_records, print_statistics, write_csv};
use listing_ripple::url::page_targets;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Listing-Ripple: a polite paginated listing scraper
///
/// Fetches every page of a listing through a token bucket and per-domain
/// concurrency limits, extracts one record per product card and writes them
/// to a CSV file.
#[derive(Parser, Debug)]
#[command(name = "listing-ripple")]
#[command(version = "1.0.0")]
#[command(about = "A polite paginated listing scraper", long_about = None)]
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

    /// Write the CSV here instead of the configured path
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Fetch every page from the network even if it was already fetched this run
    #[arg(long)]
    no_cache: bool,

    /// Validate config and show which pages would be fetched without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(output) = &cli.output {
        config.output.csv_path = output.display().to_string();
    }
    if cli.no_cache {
        config.crawler.cache_enabled = false;
    }

    if cli.dry_run {
        handle_dry_run(&config)
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_ripple=info,warn"),
            1 => EnvFilter::new("listing_ripple=debug,info"),
            2 => EnvFilter::new("listing_ripple=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved settings and target pages
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Listing-Ripple Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent pages: {}",
        config.crawler.max_concurrent_pages_open
    );
    println!(
        "  Max concurrent pages per domain: {}",
        config.crawler.max_domain_concurrency
    );
    println!(
        "  Rate limit: {} requests per {}ms",
        config.rate_limit.capacity, config.rate_limit.refill_window
    );
    println!("  Page cache: {}", on_off(config.crawler.cache_enabled));
    println!("  Respect robots.txt: {}", on_off(config.crawler.respect_robots));
    println!("  Max re-dispatch: {}", config.crawler.max_redispatch);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.value);

    println!("\nOutput:");
    println!("  CSV: {}", config.output.csv_path);
    println!("  De-duplicate: {}", on_off(config.output.dedupe));

    let targets = page_targets(&config.target.url_template, config.target.page_count)?;
    println!("\nPages ({}):", targets.len());
    for target in &targets {
        println!("  {:>3}. {}", target.page, target.url);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let scheduler = CrawlScheduler::from_config(&config)?;
    tracing::info!("Target pages: {}", scheduler.targets().len());

    let cancel = scheduler.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, letting in-flight requests finish");
            cancel.cancel();
        }
    });

    let report = scheduler.run().await;

    let mut records = report.records;
    if config.output.dedupe {
        let before = records.len();
        records = dedupe_records(records);
        tracing::info!("Removed {} duplicate records", before - records.len());
    }

    write_csv(Path::new(&config.output.csv_path), &records)
        .context("Failed to write output CSV")?;

    print_statistics(&report.stats);
    println!("\n✓ {} records written to {}", records.len(), config.output.csv_path);

    Ok(())
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
