//! Price dedupe cache
//!
//! The cache maps a product identity key to the last price the pipeline
//! accepted for it. It is the one resource shared between concurrently
//! running jobs, so the read-compare-write for a single key must be atomic;
//! each backend guarantees that in [`PriceCache::observe`].

mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use thiserror::Error;

/// Errors from a cache backend
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Prices closer than this are the same price
pub const PRICE_EPSILON: f64 = 1e-6;

/// Outcome of observing a price for an identity key
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceChange {
    /// Key was not in the cache; the price has been stored
    New,

    /// Price differs from the cached one; the cache has been updated
    Changed { previous: f64 },

    /// Price matches the cached one; the cache was left untouched
    Unchanged,
}

/// Key/value store of last-accepted prices
///
/// `observe` is the primary operation: one atomic read-compare-write per
/// record. `get`/`set` exist for callers that need the raw entries.
pub trait PriceCache: Send + Sync {
    /// Reads the cached price for a key
    fn get(&self, key: &str) -> CacheResult<Option<f64>>;

    /// Writes the price for a key unconditionally
    fn set(&self, key: &str, price: f64) -> CacheResult<()>;

    /// Compares `price` against the cached value and stores it when it is
    /// new or changed, as a single atomic operation for that key
    fn observe(&self, key: &str, price: f64) -> CacheResult<PriceChange>;
}

pub(crate) fn same_price(a: f64, b: f64) -> bool {
    (a - b).abs() < PRICE_EPSILON
}
