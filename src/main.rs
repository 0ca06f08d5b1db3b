//! snapcrawl main entry point
//!
//! This is the command-line interface for the snapcrawl snapshot crawler.

use anyhow::Context;
use clap::Parser;
use snapcrawl::config::{load_config_with_hash, validate, Config};
use snapcrawl::crawler::crawl;
use snapcrawl::output::{print_report, ArtifactWriter, CrawlReport};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// snapcrawl: snapshot crawler for web applications
///
/// snapcrawl opens every same-origin page of a web application, waits until
/// the page reports itself ready, and writes the rendered HTML as a static
/// mirror together with a sitemap.
#[derive(Parser, Debug)]
#[command(name = "snapcrawl")]
#[command(version)]
#[command(about = "Snapshot crawler for web applications", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", required_unless_present = "base_url")]
    config: Option<PathBuf>,

    /// Base URL to crawl (overrides the configuration file)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Maximum crawl depth (overrides the configuration file)
    #[arg(long)]
    depth: Option<u32>,

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

    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = resolve_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("snapcrawl=info,warn"),
            1 => EnvFilter::new("snapcrawl=debug,info"),
            2 => EnvFilter::new("snapcrawl=trace,debug"),
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

/// Loads the configuration file (if any) and applies command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<(Config, Option<String>)> {
    let (mut config, hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => {
            let base_url = cli
                .base_url
                .as_deref()
                .context("a configuration file or --base-url is required")?;
            (Config::with_base_url(base_url)?, None)
        }
    };

    if let Some(base_url) = &cli.base_url {
        config.crawl.base_url = base_url.clone();
    }
    if let Some(depth) = cli.depth {
        config.crawl.depth = depth;
    }
    validate(&config)?;

    Ok((config, hash))
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== snapcrawl Dry Run ===\n");

    println!("Crawl:");
    println!("  Base URL: {}", config.crawl.base_url);
    println!("  Max depth: {}", config.crawl.depth);
    println!("  Routing: {:?}", config.crawl.routing_mode());
    println!(
        "  Ready selector: {}",
        config.crawl.ready_selector.as_deref().unwrap_or("(none)")
    );
    println!("  Wait delay: {}ms", config.crawl.wait_delay);
    println!("  Poll interval: {}ms", config.crawl.poll_interval);
    println!("  Max concurrent pages: {}", config.crawl.max_concurrent_pages);

    println!("\nExcluded patterns ({}):", config.crawl.exclude.len());
    for pattern in &config.crawl.exclude {
        println!("  - {}", pattern);
    }

    println!("\nRenderer: {:?}", config.renderer.kind);

    println!("\nOutput:");
    if config.output.content {
        println!("  Content: {}", config.output.content_dir);
    }
    if config.output.sitemap {
        println!(
            "  Sitemap: {} ({})",
            config.output.sitemap_dir,
            config.output.change_frequency.as_str()
        );
    }
    if config.output.render {
        println!("  Snapshots: {}", config.output.render_dir);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: Option<String>) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            let _ = shutdown_tx.send(true);
        }
    });

    let outcome = match crawl(&config, shutdown_rx).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    let artifacts = ArtifactWriter::new(&config)
        .write(&outcome)
        .context("failed to write crawl artifacts")?;

    let report = CrawlReport::from_outcome(&outcome, &config.crawl.base_url, config_hash)
        .with_artifacts(artifacts);
    report.log();
    print_report(&report);

    Ok(())
}
