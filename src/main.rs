//! Shopcrawl main entry point
//!
//! Command-line front end for running one crawl job.

use anyhow::Context;
use clap::Parser;
use shopcrawl::config::{parse_proxy_list, JobParams};
use shopcrawl::{CrawlJob, JobStatus, MemoryCache, PriceCache, SqliteCache};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Shopcrawl: crawl a paginated product catalog into a JSON export
#[derive(Parser, Debug)]
#[command(name = "shopcrawl")]
#[command(version)]
#[command(about = "Paginated product-catalog crawler", long_about = None)]
struct Cli {
    /// First listing page to crawl
    #[arg(value_name = "START_URL")]
    start_url: String,

    /// Maximum number of pages to fetch (unbounded if omitted)
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Comma-separated proxy URLs; one is picked at random for the whole job
    #[arg(long, value_name = "LIST")]
    proxies: Option<String>,

    /// Export file stem (timestamp-derived name if omitted)
    #[arg(long, value_name = "NAME")]
    export_name: Option<String>,

    /// host:port to deliver the completion notification to
    #[arg(long, value_name = "ADDR")]
    notify_endpoint: Option<String>,

    /// Directory for the JSON export
    #[arg(long, value_name = "DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Directory for downloaded product images
    #[arg(long, value_name = "DIR", default_value = "images")]
    image_dir: PathBuf,

    /// Path of the shared price cache database
    #[arg(long, value_name = "FILE", default_value = "price_cache.db")]
    cache: PathBuf,

    /// Run with an in-memory price cache (nothing is deduped across runs)
    #[arg(long, conflicts_with = "cache")]
    no_cache: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let mut params = JobParams::new(&cli.start_url);
    params.page_limit = cli.max_pages;
    params.proxies = cli.proxies.as_deref().map(parse_proxy_list).unwrap_or_default();
    params.export_name = cli.export_name;
    params.notify_endpoint = cli.notify_endpoint;
    params.data_dir = cli.data_dir;
    params.image_dir = cli.image_dir;
    params.cache_path = cli.cache;

    let cache: Arc<dyn PriceCache> = if cli.no_cache {
        Arc::new(MemoryCache::new())
    } else {
        Arc::new(
            SqliteCache::open(&params.cache_path)
                .with_context(|| format!("opening price cache {}", params.cache_path.display()))?,
        )
    };

    let job = CrawlJob::new(params, cache)?;

    // Honor Ctrl-C between page fetches
    let cancel = job.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling after the current page");
            cancel.cancel();
        }
    });

    let report = job.run().await;

    println!("Status:          {}", report.status);
    println!("Pages fetched:   {}", report.pages_fetched);
    println!("Items extracted: {}", report.items_extracted);
    println!("Items saved:     {}", report.items_saved);
    if let Some(path) = &report.export_path {
        println!("Export:          {}", path.display());
    }

    if report.status == JobStatus::Failed {
        anyhow::bail!("crawl failed");
    }
    Ok(())
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shopcrawl=info,warn"),
            1 => EnvFilter::new("shopcrawl=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
