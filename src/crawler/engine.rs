//! Crawl engine
//!
//! The engine drives the sequential page loop: fetch a listing page, feed
//! its records through the pipeline, then decide whether to follow the
//! next-page link. It is strictly one page at a time because the next URL is
//! only known after the current page is parsed. One engine instance runs
//! once.

use crate::config::SelectorConfig;
use crate::crawler::{fetch_page, parse_listing};
use crate::job::CancelFlag;
use crate::pipeline::Pipeline;
use crate::{CrawlError, Result};
use reqwest::Client;
use url::Url;

/// Why a crawl loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOutcome {
    /// The last page had no next-page link (or a later page failed to fetch)
    NoMorePages,

    /// The page limit was reached while a next page still existed
    PageLimitReached,

    /// The cancellation flag was raised between pages
    Cancelled,
}

/// Sequential pagination crawler for one job
pub struct CrawlEngine {
    client: Client,
    selectors: SelectorConfig,
    page_limit: Option<u32>,
    cancel: CancelFlag,
    pages_fetched: u64,
    items_extracted: u64,
    ran: bool,
}

impl CrawlEngine {
    pub fn new(
        client: Client,
        selectors: SelectorConfig,
        page_limit: Option<u32>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            client,
            selectors,
            page_limit,
            cancel,
            pages_fetched: 0,
            items_extracted: 0,
            ran: false,
        }
    }

    /// Pages fetched so far; monotonically increasing, never reset
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Records extracted so far; monotonically increasing, never reset
    pub fn items_extracted(&self) -> u64 {
        self.items_extracted
    }

    /// Runs the crawl loop, feeding every extracted record into `pipeline`
    ///
    /// A fetch failure on the first page is fatal; on any later page it is
    /// treated as the end of pagination. Not restartable: a second call on
    /// the same engine is an error.
    pub async fn run(&mut self, start_url: &str, pipeline: &mut Pipeline) -> Result<EngineOutcome> {
        if std::mem::replace(&mut self.ran, true) {
            return Err(CrawlError::InvalidParams(
                "engine instance has already run".to_string(),
            ));
        }

        let mut current = Url::parse(start_url)?;

        loop {
            if self.cancel.is_cancelled() {
                tracing::warn!(
                    pages = self.pages_fetched,
                    "Cancellation requested, stopping crawl"
                );
                return Ok(EngineOutcome::Cancelled);
            }

            let first_page = self.pages_fetched == 0;
            let body = match fetch_page(&self.client, current.as_str()).await {
                Ok(body) => body,
                Err(e) if first_page => return Err(e),
                Err(e) => {
                    // Pagination errors do not crash an otherwise-successful
                    // crawl; a broken next link counts as the end.
                    tracing::warn!(url = %current, "Next-page fetch failed, ending pagination: {e}");
                    return Ok(EngineOutcome::NoMorePages);
                }
            };
            self.pages_fetched += 1;

            let parsed = parse_listing(&body, &self.selectors, &current)?;
            tracing::info!(
                page = self.pages_fetched,
                url = %current,
                products = parsed.records.len(),
                "Page parsed"
            );

            for record in parsed.records {
                self.items_extracted += 1;
                pipeline.feed(record).await;
            }

            if let Some(limit) = self.page_limit {
                if self.pages_fetched >= u64::from(limit) {
                    return if parsed.next_page.is_some() {
                        tracing::info!(limit, "Page limit reached, next page not fetched");
                        Ok(EngineOutcome::PageLimitReached)
                    } else {
                        Ok(EngineOutcome::NoMorePages)
                    };
                }
            }

            match parsed.next_page {
                Some(next) => current = Url::parse(&next)?,
                None => return Ok(EngineOutcome::NoMorePages),
            }
        }
    }
}
