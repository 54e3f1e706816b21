//! Price-change dedupe stage
//!
//! Drops records whose price is numerically unchanged since the last run,
//! using the shared price cache. Duplicate suppression is an optimization,
//! not a correctness requirement, so every failure mode here fails open: a
//! record with an unkeyable title, an unparseable price, or a cache backend
//! error passes through unchanged.

use crate::cache::{PriceCache, PriceChange};
use crate::pipeline::Stage;
use crate::record::ProductRecord;
use async_trait::async_trait;
use std::sync::Arc;

/// Dedupe-filter stage over a shared price cache
pub struct DedupeStage {
    cache: Arc<dyn PriceCache>,
}

impl DedupeStage {
    pub fn new(cache: Arc<dyn PriceCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Stage for DedupeStage {
    fn name(&self) -> &'static str {
        "dedupe"
    }

    async fn process(&mut self, record: ProductRecord) -> Option<ProductRecord> {
        let Some(key) = identity_key(&record.product_title) else {
            return Some(record);
        };

        let Some(price) = parse_price(&record.product_price) else {
            tracing::debug!(
                title = %record.product_title,
                price_text = %record.product_price,
                "Unparseable price, passing record through"
            );
            return Some(record);
        };

        match self.cache.observe(&key, price) {
            Ok(PriceChange::Unchanged) => {
                tracing::debug!(%key, price, "Price unchanged, dropping record");
                None
            }
            Ok(PriceChange::New) | Ok(PriceChange::Changed { .. }) => Some(record),
            Err(e) => {
                tracing::warn!(%key, "Price cache error, passing record through: {e}");
                Some(record)
            }
        }
    }
}

/// Derives the cache identity key from a title
///
/// Whitespace runs collapse to single spaces so cosmetic markup differences
/// do not split one product into several identities. Empty titles have no
/// identity.
pub fn identity_key(title: &str) -> Option<String> {
    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(format!("product:{collapsed}"))
    }
}

/// Parses raw price text into a number, leniently
///
/// Anchors on the first digit and reads the run of digits, dots, and commas
/// from there, so currency prefixes with punctuation ("Rs. 1,250") do not
/// bleed into the number. Thousands-separator commas are dropped. Returns
/// `None` when no number remains.
pub fn parse_price(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let run: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    run.replace(',', "").parse().ok()
}
