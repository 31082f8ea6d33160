//! Asset-Harvester main entry point
//!
//! This is the command-line interface for the asset-reference crawler.

use anyhow::{bail, Context};
use asset_harvester::config::{load_config_with_hash, validate, Config, SitePreset};
use asset_harvester::crawler::crawl;
use asset_harvester::extract::SiteProfile;
use asset_harvester::output::{load_statistics, print_report, print_statistics};
use asset_harvester::storage::open_store;
use asset_harvester::HarvestError;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Configuration file picked up from the working directory when present
const DEFAULT_CONFIG: &str = "asset-harvester.toml";

/// Asset-Harvester: an incremental asset-reference crawler
///
/// Walks paginated listing pages, resolves each item to one direct asset URL
/// and merges the results into a named bucket of a JSON (or `.js`) store.
/// Re-running a crawl only appends what is new.
#[derive(Parser, Debug)]
#[command(name = "asset-harvester")]
#[command(version = "1.0.0")]
#[command(about = "An incremental asset-reference crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one listing and merge its items into a bucket
    Crawl {
        /// First listing page
        start: String,

        /// Destination bucket name
        bucket: String,

        /// Upper bound on listing pages (defaults to `crawl.max-pages`)
        max_pages: Option<u32>,

        /// Site preset overriding the configured one
        #[arg(long, value_enum)]
        preset: Option<SitePreset>,
    },

    /// Crawl every configured `[[target]]` in order
    Batch,

    /// Show statistics of the configured store
    Stats,

    /// Validate configuration and show what would be crawled
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_deref())?;

    match cli.command {
        Command::Crawl {
            start,
            bucket,
            max_pages,
            preset,
        } => {
            let max_pages = max_pages.unwrap_or(config.crawl.max_pages);
            handle_crawl(&config, &start, &bucket, max_pages, preset).await
        }
        Command::Batch => handle_batch(&config).await,
        Command::Stats => handle_stats(&config),
        Command::Check => handle_check(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("asset_harvester=info,warn"),
            1 => EnvFilter::new("asset_harvester=debug,info"),
            2 => EnvFilter::new("asset_harvester=trace,debug"),
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

/// Loads the configuration
///
/// An explicit `--config` must exist. Without it, `asset-harvester.toml` in
/// the working directory is used when present, otherwise the defaults.
fn load(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG);
            if !fallback.exists() {
                tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG);
                let config = Config::default();
                validate(&config)?;
                return Ok(config);
            }
            fallback
        }
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(&path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    Ok(config)
}

/// Handles the crawl command
async fn handle_crawl(
    config: &Config,
    start: &str,
    bucket: &str,
    max_pages: u32,
    preset: Option<SitePreset>,
) -> anyhow::Result<()> {
    match crawl(config, start, bucket, max_pages, preset).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            report_failure(bucket, &e);
            Err(e.into())
        }
    }
}

/// Handles the batch command: every target runs even if an earlier one failed
async fn handle_batch(config: &Config) -> anyhow::Result<()> {
    if config.targets.is_empty() {
        bail!("No [[target]] entries configured");
    }

    let total = config.targets.len();
    let mut failed = Vec::new();

    for (position, target) in config.targets.iter().enumerate() {
        let max_pages = target.max_pages.unwrap_or(config.crawl.max_pages);
        tracing::info!("Target {}/{}: '{}'", position + 1, total, target.bucket);

        match crawl(config, &target.start, &target.bucket, max_pages, target.preset).await {
            Ok(report) => {
                print_report(&report);
                println!();
            }
            Err(e) => {
                report_failure(&target.bucket, &e);
                failed.push(target.bucket.clone());
            }
        }
    }

    if !failed.is_empty() {
        bail!(
            "{} of {} target(s) failed: {}",
            failed.len(),
            total,
            failed.join(", ")
        );
    }

    tracing::info!("All {} target(s) completed", total);
    Ok(())
}

fn report_failure(bucket: &str, error: &HarvestError) {
    match error {
        HarvestError::Persist { outcome, .. } => {
            tracing::error!(
                "Crawl of '{}' finished but {} item(s) were not saved: {}",
                bucket,
                outcome.items.len(),
                error
            );
        }
        _ => tracing::error!("Crawl of '{}' failed: {}", bucket, error),
    }
}

/// Handles the stats command
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store = open_store(&config.store);
    let stats = load_statistics(&store)?;
    print_statistics(&stats);
    Ok(())
}

/// Handles the check command: validates config and shows what would be crawled
fn handle_check(config: &Config) -> anyhow::Result<()> {
    println!("=== Asset-Harvester Check ===\n");

    println!("Fetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!(
        "  Attempts: {} ({}ms apart)",
        config.fetcher.max_attempts, config.fetcher.retry_delay_ms
    );
    println!("  User agent: {}", config.fetcher.user_agent);
    if let Some(referer) = &config.fetcher.referer {
        println!("  Referer: {}", referer);
    }

    println!("\nCrawl:");
    println!("  Page delay: {}ms", config.crawl.page_delay_ms);
    println!("  Item delay: {}ms", config.crawl.item_delay_ms);
    println!("  Max pages: {}", config.crawl.max_pages);
    if config.crawl.checkpoint_every > 0 {
        println!("  Checkpoint every {} page(s)", config.crawl.checkpoint_every);
    }

    println!("\nStore:");
    let store = open_store(&config.store);
    println!("  Path: {}", store.path().display());
    println!("  Format: {:?}", store.format());
    if let Some(dir) = &config.store.snapshot_dir {
        println!("  Snapshots: {}", dir);
    }

    let profile = SiteProfile::from_config(&config.site)?;
    print_profile(&profile);

    println!("\nTargets ({}):", config.targets.len());
    for target in &config.targets {
        let preset = target.preset.unwrap_or(config.site.preset);
        println!(
            "  - {} <- {} (max {} pages, {})",
            target.bucket,
            target.start,
            target.max_pages.unwrap_or(config.crawl.max_pages),
            preset.as_str()
        );
        if preset != config.site.preset {
            SiteProfile::from_config_with_preset(&config.site, preset)
                .with_context(|| format!("Invalid site profile for target '{}'", target.bucket))?;
        }
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

fn print_profile(profile: &SiteProfile) {
    println!("\nSite ({}):", profile.name);
    if let Some(base) = &profile.base_url {
        println!("  Base URL: {}", base);
    }
    println!("  Item links: {}*", profile.item_link_prefix);
    println!(
        "  Pagination: {}=N+1 with non-empty {}",
        profile.page_param, profile.token_param
    );
    println!("  Download params: {}", profile.download_params.join(", "));
    if let Some(selector) = &profile.media_selector {
        println!("  Media selector: {}", selector);
    }
    if !profile.media_extensions.is_empty() {
        println!("  Body scan: {}", profile.media_extensions.join(", "));
    }

    let rules = |rules: &[asset_harvester::url::HostRule]| -> String {
        if rules.is_empty() {
            return "(none)".to_string();
        }
        rules
            .iter()
            .map(|r| format!("{}{}", r.host_pattern(), r.path_prefix().unwrap_or("")))
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!("  Allow: {}", rules(profile.policy.allow_rules()));
    println!("  Deny: {}", rules(profile.policy.deny_rules()));
}
