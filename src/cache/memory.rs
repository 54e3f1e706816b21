//! In-memory price cache backend
//!
//! Used by tests and by jobs that deliberately run without a shared cache
//! file. Atomicity of `observe` comes from holding the map guard across the
//! read and the write.

use crate::cache::{same_price, CacheResult, PriceCache, PriceChange};
use std::collections::HashMap;
use std::sync::Mutex;

/// HashMap-backed price cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, f64>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PriceCache for MemoryCache {
    fn get(&self, key: &str) -> CacheResult<Option<f64>> {
        Ok(self.entries.lock().unwrap().get(key).copied())
    }

    fn set(&self, key: &str, price: f64) -> CacheResult<()> {
        self.entries.lock().unwrap().insert(key.to_string(), price);
        Ok(())
    }

    fn observe(&self, key: &str, price: f64) -> CacheResult<PriceChange> {
        let mut entries = self.entries.lock().unwrap();
        let change = match entries.get(key) {
            None => PriceChange::New,
            Some(&p) if same_price(p, price) => PriceChange::Unchanged,
            Some(&p) => PriceChange::Changed { previous: p },
        };
        if !matches!(change, PriceChange::Unchanged) {
            entries.insert(key.to_string(), price);
        }
        Ok(change)
    }
}
