//! Job configuration
//!
//! This module defines the parameters for one crawl job and the CSS
//! selectors used to pull product data out of a listing page. Parameters
//! arrive from the caller (CLI or embedding code); there is no config file.

use crate::{CrawlError, Result};
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

/// Parameters for one crawl job
#[derive(Debug, Clone)]
pub struct JobParams {
    /// First listing page to fetch
    pub start_url: String,

    /// Maximum number of pages to fetch; unbounded when `None`
    pub page_limit: Option<u32>,

    /// Candidate proxy URLs; one is picked uniformly at random at job start
    /// and held fixed for every request of the job
    pub proxies: Vec<String>,

    /// Endpoint for the completion notification; skipped when `None`
    pub notify_endpoint: Option<String>,

    /// Export file stem; a timestamp-derived name is used when `None`
    pub export_name: Option<String>,

    /// Directory the JSON export is written under
    pub data_dir: PathBuf,

    /// Directory downloaded images are written under
    pub image_dir: PathBuf,

    /// Path of the shared sqlite price cache
    pub cache_path: PathBuf,

    /// Selectors describing the target site's listing markup
    pub selectors: SelectorConfig,
}

impl JobParams {
    /// Creates parameters with default directories and selectors
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            page_limit: None,
            proxies: Vec::new(),
            notify_endpoint: None,
            export_name: None,
            data_dir: PathBuf::from("data"),
            image_dir: PathBuf::from("images"),
            cache_path: PathBuf::from("price_cache.db"),
            selectors: SelectorConfig::default(),
        }
    }

    /// Validates the parameters
    ///
    /// Rejects an empty or unparseable start URL and a zero page limit.
    pub fn validate(&self) -> Result<()> {
        if self.start_url.trim().is_empty() {
            return Err(CrawlError::InvalidParams("start URL is empty".to_string()));
        }

        if let Err(e) = Url::parse(&self.start_url) {
            return Err(CrawlError::InvalidParams(format!(
                "start URL {:?} is not a valid URL: {}",
                self.start_url, e
            )));
        }

        if self.page_limit == Some(0) {
            return Err(CrawlError::InvalidParams(
                "page limit must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Splits a comma-separated proxy list into entries, dropping blanks
pub fn parse_proxy_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// CSS selectors and attribute names for a listing page
///
/// Defaults match the catalog layout the crawler was originally written
/// against; other shops are a config change, not a code change.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Selector matching one product container per product
    pub product: String,

    /// Selector for the node carrying the title, relative to the container
    pub title: String,

    /// Attribute the title is read from; inner text when `None`
    pub title_attr: Option<String>,

    /// Selector for the node carrying the price text
    pub price: String,

    /// Selector for the image node
    pub image: String,

    /// Attribute the image URL is read from
    pub image_attr: String,

    /// Selector for the next-page link (href attribute)
    pub next_page: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            product: "div.product-inner".to_string(),
            title: "div.mf-product-thumbnail img".to_string(),
            title_attr: Some("title".to_string()),
            price: "div.mf-product-details bdi".to_string(),
            image: "div.mf-product-thumbnail img".to_string(),
            image_attr: "data-lazy-src".to_string(),
            next_page: "a.next.page-numbers".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_params_pass() {
        let params = JobParams::new("https://shop.example.com/catalog");
        assert!(params.validate().is_ok());
    }

    #[test]
    fn empty_start_url_rejected() {
        let params = JobParams::new("  ");
        assert!(params.validate().is_err());
    }

    #[test]
    fn malformed_start_url_rejected() {
        let params = JobParams::new("not a url");
        assert!(params.validate().is_err());
    }

    #[test]
    fn zero_page_limit_rejected() {
        let mut params = JobParams::new("https://shop.example.com/catalog");
        params.page_limit = Some(0);
        assert!(params.validate().is_err());
    }

    #[test]
    fn proxy_list_splits_and_trims() {
        let proxies = parse_proxy_list("http://a:8080, http://b:8080,,");
        assert_eq!(proxies, vec!["http://a:8080", "http://b:8080"]);
    }
}
