//! Shopcrawl: a paginated product-catalog crawler
//!
//! This crate crawls a paginated product-listing site, extracts structured
//! product records, drops records whose price has not changed since the last
//! run, optionally downloads product images, persists the accepted records as
//! a single JSON document, and delivers a best-effort completion notification
//! to an external listener.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod job;
pub mod notify;
pub mod pipeline;
pub mod record;

use thiserror::Error;

/// Main error type for shopcrawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid job parameters: {0}")]
    InvalidParams(String),

    #[error("Fetch failed for {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for shopcrawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use cache::{MemoryCache, PriceCache, PriceChange, SqliteCache};
pub use config::{JobParams, SelectorConfig};
pub use job::{CancelFlag, CrawlJob, JobReport, JobStatus};
pub use notify::{CrawlSummary, NotificationClient};
pub use record::ProductRecord;
