//! Potator crawler main entry point
//!
//! This is the command-line interface for the Potator web crawler.

use anyhow::Context;
use clap::Parser;
use potator_crawler::config::{load_config_with_hash, Config};
use potator_crawler::output::print_summary;
use potator_crawler::storage::open_storage;
use potator_crawler::CrawlEngine;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Potator: a polite, concurrent web crawler
///
/// Potator crawls outward from seed URLs while respecting robots.txt and a
/// per-host politeness interval, bounded by a depth limit and a page budget.
#[derive(Parser, Debug)]
#[command(name = "potator-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A polite, concurrent web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults if absent)
    #[arg(value_name = "CONFIG", default_value = "crawler.toml")]
    config: PathBuf,

    /// Seed URL to crawl from; repeat for several. Replaces configured seeds
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    match config_hash {
        Some(hash) => tracing::info!("Configuration loaded successfully (hash: {})", hash),
        None => tracing::info!("Using built-in default configuration"),
    }

    let seeds = if cli.seeds.is_empty() {
        config.crawler.seeds.clone()
    } else {
        cli.seeds.clone()
    };

    if cli.dry_run {
        handle_dry_run(&config, &seeds);
        return Ok(());
    }

    handle_crawl(config, seeds).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("potator_crawler=info,warn"),
            1 => EnvFilter::new("potator_crawler=debug,info"),
            2 => EnvFilter::new("potator_crawler=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, seeds: &[String]) {
    let crawler = &config.crawler;

    println!("=== Potator Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max pages: {}", crawler.max_pages);
    println!("  Max depth: {}", crawler.max_depth);
    println!("  Workers: {}", crawler.workers);
    println!("  User agent: {}", crawler.user_agent);
    println!("  Politeness interval: {}ms", crawler.politeness_ms);
    println!(
        "  Fetch retries: {} ({:?} backoff from {}ms)",
        crawler.fetch_retries, crawler.fetch_backoff_strategy, crawler.fetch_backoff_ms
    );
    println!("  Max body size: {} bytes", crawler.max_body_bytes);
    println!("  Follow sitemaps: {}", crawler.follow_sitemaps);
    match crawler.proxy() {
        Some(proxy) => println!("  Proxy: {}", proxy.url()),
        None => println!("  Proxy: none"),
    }

    println!("\nStorage:");
    println!("  Backend: {:?}", crawler.storage_backend);
    println!("  Directory: {}", crawler.storage_dir.display());
    match &crawler.frontier_db {
        Some(path) => println!("  Frontier: {}", path.display()),
        None => println!("  Frontier: in memory"),
    }

    if config.allowed_hosts.is_empty() {
        println!("\nAllowed hosts: unrestricted");
    } else {
        let mut hosts: Vec<_> = config.allowed_hosts.iter().collect();
        hosts.sort();
        println!("\nAllowed hosts ({}):", hosts.len());
        for host in hosts {
            println!("  - {}", host);
        }
    }

    println!("\nSeeds ({}):", seeds.len());
    for seed in seeds {
        println!("  * {}", potator_crawler::normalize(seed));
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, seeds: Vec<String>) -> anyhow::Result<()> {
    tracing::info!("Total seed URLs: {}", seeds.len());

    let storage = open_storage(&config.crawler).with_context(|| {
        format!(
            "cannot open storage at {}",
            config.crawler.storage_dir.display()
        )
    })?;

    let engine = CrawlEngine::new(config, storage).context("failed to build crawl engine")?;

    let cancel = engine.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, shutting down");
            cancel.cancel();
        }
    });

    let summary = engine.run(&seeds).await;
    tracing::info!("{}", summary);
    print_summary(&summary);

    Ok(())
}
