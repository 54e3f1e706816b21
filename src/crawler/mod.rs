//! Crawl engine and its collaborators
//!
//! The crawler is split into three parts:
//! - `fetcher`: HTTP client construction and page fetching
//! - `parser`: pulling product records and the next-page link out of HTML
//! - `engine`: the sequential pagination loop feeding the pipeline

pub mod engine;
pub mod fetcher;
pub mod parser;

pub use engine::{CrawlEngine, EngineOutcome};
pub use fetcher::{build_http_client, fetch_page};
pub use parser::{parse_listing, ParsedListing};
