//! Driftnet crawler entry point
//!
//! Loads a TOML configuration, brings up the engine against the configured
//! frontier store, and runs the crawl until the page cap, idle shutdown, or
//! Ctrl-C ends it.

use clap::Parser;
use driftnet::engine::{Controller, Engine};
use driftnet::frontier::ClearOptions;
use driftnet::config::load_config_with_hash;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Driftnet: a distributed web-crawler core
#[derive(Parser, Debug)]
#[command(name = "driftnet")]
#[command(version)]
#[command(about = "Distributed web crawler with a shared URL frontier", long_about = None)]
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

    /// Clear all frontier state before crawling
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)?;
    tracing::info!(hash = %config_hash, "configuration loaded");

    if cli.dry_run {
        print_dry_run(&config);
        return Ok(());
    }

    let engine = Engine::new(config).await?;

    if cli.fresh {
        tracing::info!("clearing previous frontier state");
        let report = engine.reset(ClearOptions::all(), true).await?;
        tracing::info!(deleted = report.frontier.deleted, "frontier cleared");
    }

    let controller = Controller::new(engine);

    tokio::select! {
        result = std::sync::Arc::clone(controller.engine()).run() => {
            result?;
            tracing::info!("crawl completed");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
        }
    }

    controller.engine().close().await;

    let status = controller.status().await;
    println!(
        "Crawled {} pages ({} errors, {} robots-denied); queue={} completed={}",
        status.pages_crawled,
        status.errors,
        status.robots_denied,
        status.queue_size,
        status.completed_count
    );

    Ok(())
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("driftnet=info,warn"),
            1 => EnvFilter::new("driftnet=debug,info"),
            2 => EnvFilter::new("driftnet=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Prints what a crawl with this config would do
fn print_dry_run(config: &driftnet::CrawlerConfig) {
    println!("=== Driftnet Dry Run ===\n");

    println!("Crawler:");
    println!("  Workers: {}", config.workers);
    println!("  Max depth: {}", config.max_depth);
    println!(
        "  Max pages: {}",
        if config.max_pages > 0 {
            config.max_pages.to_string()
        } else {
            "unlimited".to_string()
        }
    );
    println!("  Default delay: {}s", config.default_delay);
    println!("  Respect robots.txt: {}", config.respect_robots_txt);

    println!("\nFrontier store:");
    println!("  {}:{} (db {})", config.store.host, config.store.port, config.store.db);

    println!("\nOutputs:");
    if config.enable_bus_output {
        println!("  Bus: {} topic {}", config.bus_brokers, config.bus_topic);
    }
    if config.enable_local_save {
        println!("  Files: {} (job {})", config.local_output_dir, config.job_name);
    }

    println!("\nSeed URLs ({}):", config.seed_urls.len());
    for seed in &config.seed_urls {
        println!("  - {}", seed);
    }
    if let Some(file) = &config.seed_urls_file {
        println!("  + seeds from file: {}", file);
    }

    if config.allowed_domains.is_empty() {
        println!("\nAllowed domains: derived from seeds");
    } else {
        println!("\nAllowed domains ({}):", config.allowed_domains.len());
        for domain in &config.allowed_domains {
            println!("  - {}", domain);
        }
    }

    println!("\nConfiguration is valid");
}
