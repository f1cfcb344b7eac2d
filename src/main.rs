//! Site-Mirror main entry point
//!
//! This is the command-line interface for the Site-Mirror crawler.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use site_mirror::config::{load_config_with_hash, validate, Config};
use site_mirror::crawler::{Coordinator, HttpFetcher};
use site_mirror::output::{generate_markdown_manifest, print_statistics, RunInfo};
use site_mirror::storage::{clean_dir, ResourceStore};
use site_mirror::url::prepare_seed;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Site-Mirror: a bounded-depth site mirroring crawler
///
/// Site-Mirror downloads a page, follows its same-site links up to DEPTH
/// hops, and writes every resource into a local directory tree that can be
/// browsed offline.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version)]
#[command(about = "A bounded-depth concurrent site mirroring crawler", long_about = None)]
struct Cli {
    /// URL to start mirroring from
    #[arg(value_name = "URL")]
    url: String,

    /// How many links deep to follow (0 downloads only URL)
    #[arg(value_name = "DEPTH")]
    depth: u32,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Directory to write the mirror into
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short, long, value_name = "N")]
    workers: Option<usize>,

    /// Crawl deadline in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Keep crawling after errors instead of stopping at the first one
    #[arg(long)]
    keep_going: bool,

    /// Write a markdown manifest of the mirror to FILE
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Delete the output directory before crawling
    #[arg(long)]
    clean: bool,

    /// Validate arguments and configuration, then exit without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = load_configuration(&cli)?;
    let seed = prepare_seed(&cli.url).with_context(|| format!("invalid URL '{}'", cli.url))?;

    if cli.dry_run {
        handle_dry_run(&cli, &config, &seed);
        return Ok(());
    }

    handle_mirror(&cli, config, config_hash, seed).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            2 => EnvFilter::new("site_mirror=trace,debug"),
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

/// Loads the configuration file, if any, and applies command-line overrides
fn load_configuration(cli: &Cli) -> Result<(Config, Option<String>)> {
    let (mut config, hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    if let Some(output) = &cli.output {
        config.output.mirror_dir = output.clone();
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(timeout) = cli.timeout {
        config.crawler.timeout_secs = timeout;
    }
    if cli.keep_going {
        config.crawler.fail_fast = false;
    }
    if let Some(manifest) = &cli.manifest {
        config.output.manifest_path = Some(manifest.clone());
    }

    validate(&config).context("invalid configuration")?;
    Ok((config, hash))
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(cli: &Cli, config: &Config, seed: &url::Url) {
    println!("=== Site-Mirror Dry Run ===\n");

    println!("Seed: {}", seed);
    println!("Max depth: {}", cli.depth);

    println!("\nCrawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Queue capacity: {}", config.crawler.queue_capacity);
    println!("  Timeout: {}s", config.crawler.timeout_secs);
    println!("  Fail fast: {}", config.crawler.fail_fast);
    println!("  Scope: {:?}", config.crawler.scope);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Mirror directory: {}", config.output.mirror_dir.display());
    if let Some(manifest) = &config.output.manifest_path {
        println!("  Manifest: {}", manifest.display());
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the default mode: runs the crawl and reports on it
async fn handle_mirror(
    cli: &Cli,
    config: Config,
    config_hash: Option<String>,
    seed: url::Url,
) -> Result<()> {
    if cli.clean {
        tracing::info!("Removing {}", config.output.mirror_dir.display());
        clean_dir(&config.output.mirror_dir)?;
    }

    let store = Arc::new(
        ResourceStore::open(&config.output.mirror_dir).context("failed to open mirror directory")?,
    );
    let fetcher = Arc::new(
        HttpFetcher::from_config(&config.fetch, &config.user_agent)
            .context("failed to build HTTP client")?,
    );
    let coordinator = Coordinator::new(
        seed.clone(),
        cli.depth,
        &config.crawler,
        store.clone(),
        fetcher,
    )?;

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let started_at = Utc::now();
    let report = coordinator.run(cancel).await;
    let finished_at = Utc::now();

    if !cli.quiet {
        println!();
        print_statistics(&report.stats);
    }

    if let Some(path) = &config.output.manifest_path {
        let run = RunInfo {
            seed: seed.to_string(),
            max_depth: cli.depth,
            started_at,
            finished_at,
            config_hash,
        };
        generate_markdown_manifest(&run, &report, &store, path)
            .with_context(|| format!("failed to write manifest {}", path.display()))?;
        tracing::info!("Manifest written to {}", path.display());
    }

    report.into_result().context("mirror incomplete")?;
    Ok(())
}

/// Cancels the crawl on the first Ctrl-C and exits on the second
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupt received, finishing in-flight downloads");
        tracing::warn!("Press Ctrl-C again to exit immediately");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}
