//! Shelf-Mapper main entry point
//!
//! This is the command-line interface for the Shelf-Mapper catalog crawler.

use clap::Parser;
use shelf_mapper::config::{load_config_with_hash, validate, Config, OutputFormat};
use shelf_mapper::crawler::{run_crawl, CrawlMode, Orchestrator};
use shelf_mapper::state::LoggingObserver;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Shelf-Mapper: maps the category hierarchy of an online shop
///
/// Shelf-Mapper crawls the main listing pages of a shop, follows every
/// category to its subcategories, and exports the records as JSON or CSV,
/// optionally assembled into a category tree.
#[derive(Parser, Debug)]
#[command(name = "shelf-mapper")]
#[command(version)]
#[command(about = "Maps the category hierarchy of an online shop", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply without one)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed URL; repeat for several (overrides the configured seeds)
    #[arg(short = 'u', long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Export format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Build the category tree and export it
    #[arg(short, long)]
    tree: bool,

    /// Maximum number of requests for the whole crawl
    #[arg(short, long, value_name = "N")]
    max: Option<u32>,

    /// Only extract top-level categories
    #[arg(long, conflicts_with = "subcategories_only")]
    categories_only: bool,

    /// Treat the seeds as category pages and only extract their subcategories
    #[arg(long, conflicts_with = "categories_only")]
    subcategories_only: bool,

    /// Log progress after every page
    #[arg(long)]
    progress: bool,

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

impl Cli {
    fn mode(&self, config: &Config) -> CrawlMode {
        if self.categories_only {
            CrawlMode::CategoriesOnly
        } else if self.subcategories_only {
            CrawlMode::SubcategoriesOnly
        } else {
            CrawlMode::from_config(&config.extraction)
        }
    }

    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if !self.urls.is_empty() {
            config.site.seeds = self.urls.clone();
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if self.tree {
            config.extraction.build_tree = true;
        }
        if let Some(max) = self.max {
            config.crawler.max_requests_per_crawl = max;
        }
        if self.categories_only {
            config.extraction.subcategories = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    (cfg, hash)
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            (Config::default(), "defaults".to_string())
        }
    };

    cli.apply_overrides(&mut config);
    if let Err(e) = validate(&config) {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    let mode = cli.mode(&config);

    if cli.dry_run {
        handle_dry_run(&config, mode);
    } else {
        handle_crawl(config, mode, &config_hash, cli.progress).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelf_mapper=info,warn"),
            1 => EnvFilter::new("shelf_mapper=debug,info"),
            2 => EnvFilter::new("shelf_mapper=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration and seeds
fn handle_dry_run(config: &Config, mode: CrawlMode) {
    println!("=== Shelf-Mapper Dry Run ===\n");

    println!("Site: {}", config.site.name);
    println!("Mode: {:?}", mode);

    println!("\nCrawler Configuration:");
    println!("  Max concurrency: {}", config.crawler.max_concurrency);
    println!(
        "  Max requests per crawl: {}",
        config.crawler.max_requests_per_crawl
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!(
        "  Retries: {} ({}ms apart)",
        config.crawler.max_retries, config.crawler.retry_delay_ms
    );
    println!(
        "  Dedupe category URLs: {}",
        config.crawler.dedupe_category_urls
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    if !config.proxy.urls.is_empty() {
        println!("\nProxies ({}):", config.proxy.urls.len());
        for proxy in &config.proxy.urls {
            println!("  - {}", proxy);
        }
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Export directory: {}", config.output.export_dir);
    println!("  Format: {:?}", config.output.format);
    println!("  Category tree: {}", config.extraction.build_tree);

    let seeds = config.seed_urls();
    println!("\nSeeds ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    mode: CrawlMode,
    config_hash: &str,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Crawling {} with {} seed URL(s)",
        config.site.name,
        config.seed_urls().len()
    );

    let mut orchestrator = Orchestrator::from_config(config)?.with_mode(mode);
    if progress {
        orchestrator = orchestrator.with_observer(Arc::new(LoggingObserver));
    }

    match run_crawl(&orchestrator, config_hash).await {
        Ok(summary) => {
            tracing::info!(
                "Crawl completed: {} succeeded, {} failed",
                summary.requests_succeeded,
                summary.requests_failed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
