//! Site-Indexer main entry point
//!
//! This is the command-line interface for the Site-Indexer crawl engine.

use anyhow::Context;
use clap::Parser;
use site_indexer::config::{load_config_with_hash, Config};
use site_indexer::crawler::{Coordinator, IndexingError};
use site_indexer::output::{load_statistics, print_statistics};
use site_indexer::storage::open_storage;
use site_indexer::url::normalize_site_root;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Site-Indexer: a concurrent site crawler for search indexing
///
/// Site-Indexer crawls every configured site in parallel, captures each
/// reachable page and stores it in SQLite. Press Ctrl+C once to stop the
/// run gracefully, twice to exit immediately.
#[derive(Parser, Debug)]
#[command(name = "site-indexer")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent site crawler for search indexing", long_about = None)]
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

    /// Validate config and show what would be indexed without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show per-site results from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_indexing(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_indexer=info,warn"),
            1 => EnvFilter::new("site_indexer=debug,info"),
            2 => EnvFilter::new("site_indexer=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be indexed
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Site-Indexer Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Parallelism per site: {}", config.crawler.parallelism);
    println!("  Batch size: {}", config.crawler.batch_size);
    println!(
        "  Save retries: {} (initial delay {}ms)",
        config.crawler.max_save_retries, config.crawler.retry_delay_ms
    );
    println!(
        "  Stop grace period: {}ms",
        config.crawler.stop_grace_period_ms
    );

    println!("\nFetch:");
    println!("  User agent: {}", config.fetch.user_agent);
    if let Some(referrer) = &config.fetch.referrer {
        println!("  Referrer: {}", referrer);
    }
    println!("  Timeout: {}s", config.fetch.timeout_secs);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        let root = normalize_site_root(&site.url)?;
        println!("  - {} ({})", site.name, root);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start indexing {} sites", config.sites.len());

    Ok(())
}

/// Handles the --stats mode: shows per-site results from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let repository = open_storage(Path::new(&config.output.database_path))
        .context("failed to open database")?;
    let stats = load_statistics(&repository)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main indexing run
async fn handle_indexing(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Sites to index: {}", config.sites.len());

    let coordinator = Coordinator::from_config(config)?;
    coordinator.start_indexing().await?;

    tokio::select! {
        _ = coordinator.wait_until_stopped() => {}
        interrupted = tokio::signal::ctrl_c() => {
            interrupted.context("failed to listen for Ctrl+C")?;
            tracing::info!("Interrupt received, stopping (press Ctrl+C again to exit immediately)");

            match coordinator.stop_indexing().await {
                Ok(()) | Err(IndexingError::NotRunning) => {}
                Err(e) => return Err(e.into()),
            }

            tokio::select! {
                _ = coordinator.wait_until_stopped() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("Second interrupt received, exiting without waiting");
                    std::process::exit(130);
                }
            }
        }
    }

    let dropped = coordinator.dropped_pages();
    if dropped > 0 {
        tracing::warn!("{} captured pages could not be saved", dropped);
    }

    let stats = load_statistics(coordinator.repository().as_ref())?;
    print_statistics(&stats);

    Ok(())
}
