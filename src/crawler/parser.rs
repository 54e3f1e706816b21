//! Listing-page parser
//!
//! Extracts product records and the next-page link from a fetched listing
//! page using the job's [`SelectorConfig`]. Extraction is tolerant: a
//! container missing a title, price, or image still yields a record with the
//! missing fields empty/absent.

use crate::config::SelectorConfig;
use crate::record::ProductRecord;
use crate::{CrawlError, Result};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Extracted content of one listing page
#[derive(Debug, Clone)]
pub struct ParsedListing {
    /// Product records in page order
    pub records: Vec<ProductRecord>,

    /// Absolute URL of the next listing page, if the page links one
    pub next_page: Option<String>,
}

struct CompiledSelectors {
    product: Selector,
    title: Selector,
    price: Selector,
    image: Selector,
    next_page: Selector,
}

impl CompiledSelectors {
    fn compile(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            product: compile(&config.product)?,
            title: compile(&config.title)?,
            price: compile(&config.price)?,
            image: compile(&config.image)?,
            next_page: compile(&config.next_page)?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| CrawlError::InvalidParams(format!("bad selector {selector:?}: {e}")))
}

/// Parses one listing page
///
/// # Arguments
///
/// * `html` - The fetched page body
/// * `config` - Selectors describing the listing markup
/// * `base_url` - URL the page was fetched from, for resolving relative links
pub fn parse_listing(html: &str, config: &SelectorConfig, base_url: &Url) -> Result<ParsedListing> {
    let selectors = CompiledSelectors::compile(config)?;
    let document = Html::parse_document(html);

    let mut records = Vec::new();
    for container in document.select(&selectors.product) {
        records.push(extract_record(&container, config, &selectors, base_url));
    }

    let next_page = document
        .select(&selectors.next_page)
        .next()
        .and_then(|node| node.value().attr("href"))
        .and_then(|href| resolve(href, base_url));

    Ok(ParsedListing { records, next_page })
}

/// Extracts one record from a product container node
fn extract_record(
    container: &ElementRef,
    config: &SelectorConfig,
    selectors: &CompiledSelectors,
    base_url: &Url,
) -> ProductRecord {
    let title = container
        .select(&selectors.title)
        .next()
        .and_then(|node| match &config.title_attr {
            Some(attr) => node.value().attr(attr).map(str::to_string),
            None => Some(node.text().collect::<String>()),
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let price = container
        .select(&selectors.price)
        .next()
        .map(|node| node.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let image_url = container
        .select(&selectors.image)
        .next()
        .and_then(|node| node.value().attr(&config.image_attr))
        .and_then(|src| resolve(src, base_url));

    ProductRecord {
        product_title: title,
        product_price: price,
        image_url,
        local_path: None,
    }
}

/// Resolves a possibly-relative href against the page URL
fn resolve(href: &str, base_url: &Url) -> Option<String> {
    base_url.join(href).ok().map(|u| u.to_string())
}
