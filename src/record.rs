//! Product record data model
//!
//! A [`ProductRecord`] is one extracted catalog entry. Field names match the
//! persisted JSON layout, so the struct serializes directly into the export
//! document.

use serde::{Deserialize, Serialize};

/// One extracted product entry
///
/// Records are created by the crawl engine, one per matched container node,
/// and flow through the pipeline stages in page order. Missing source markup
/// yields empty/absent fields rather than an error; partial records are still
/// emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product title (empty if the source markup was malformed)
    pub product_title: String,

    /// Raw extracted price text; numeric parsing happens in the dedupe stage
    pub product_price: String,

    /// Source URL of the product image, when the listing carried one
    pub image_url: Option<String>,

    /// Path of the downloaded image; set by the image stage, absent if
    /// `image_url` is absent or the download failed
    pub local_path: Option<String>,
}

impl ProductRecord {
    pub fn new(title: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            product_title: title.into(),
            product_price: price.into(),
            image_url: None,
            local_path: None,
        }
    }
}
