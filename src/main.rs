//! Ripple-Crawl main entry point
//!
//! This is the command-line interface for the Ripple-Crawl web graph crawler.

use anyhow::Context;
use clap::Parser;
use ripple_crawl::config::{load_config, validate, validate_seed, Config};
use ripple_crawl::crawl;
use ripple_crawl::output::print_statistics;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Ripple-Crawl: a paced, concurrent web graph crawler
///
/// Crawls outward from a seed URL up to a maximum link depth, writing the
/// title, description and outgoing links of every visited page to one JSON
/// file per worker.
#[derive(Parser, Debug)]
#[command(name = "ripple-crawl")]
#[command(version = "1.0.0")]
#[command(about = "A paced, concurrent web graph crawler", long_about = None)]
struct Cli {
    /// URL to start crawling from
    #[arg(value_name = "SEED")]
    seed: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Maximum link depth from the seed (seed is depth 0)
    #[arg(short = 'd', long)]
    max_depth: Option<u32>,

    /// Minimum gap between requests to the same domain, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Per-request timeout, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Directory for the per-worker JSON files
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Leave the output files exactly as the workers wrote them
    #[arg(long)]
    no_finalize: bool,

    /// Validate config and seed, print the effective settings, and exit
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    validate(&config).context("Invalid configuration")?;
    validate_seed(&cli.seed).context("Invalid seed URL")?;

    if cli.dry_run {
        handle_dry_run(&config, &cli.seed);
        return Ok(());
    }

    handle_crawl(&config, &cli.seed)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_crawl=info,warn"),
            1 => EnvFilter::new("ripple_crawl=debug,info"),
            2 => EnvFilter::new("ripple_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_file(false)
        .init();
}

/// Loads the config file (if any) and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.crawler.delay_ms = delay_ms;
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        config.fetcher.timeout_secs = timeout_secs;
    }
    if let Some(output_dir) = &cli.output_dir {
        config.output.directory = output_dir.clone();
    }
    if cli.no_finalize {
        config.output.finalize = false;
    }

    Ok(config)
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, seed: &str) {
    println!("=== Ripple-Crawl Dry Run ===\n");

    println!("Seed: {}\n", seed);

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Per-domain delay: {}ms", config.crawler.delay_ms);
    println!("  Idle poll interval: {}ms", config.crawler.poll_interval_ms);

    println!("\nFetcher:");
    println!("  User agent: {}", config.fetcher.user_agent);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  Max redirects: {}", config.fetcher.max_redirects);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Finalize: {}", config.output.finalize);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
fn handle_crawl(config: &Config, seed: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} with {} workers into {}",
        seed,
        config.crawler.workers,
        config.output.directory
    );

    match crawl(config, seed) {
        Ok(report) => {
            tracing::info!(
                "Crawl completed ({:?}) in {:.1}s",
                report.reason,
                report.elapsed.as_secs_f64()
            );
            print_statistics(&report.stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
