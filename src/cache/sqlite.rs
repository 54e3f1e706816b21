//! SQLite price cache backend
//!
//! A single-table rusqlite store. The connection sits behind a mutex so one
//! `observe` call is one guarded transaction; across processes the same
//! atomicity comes from sqlite's own file locking.

use crate::cache::{same_price, CacheResult, PriceCache, PriceChange};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed price cache
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Opens (or creates) the cache database at `path`
    pub fn open(path: &Path) -> CacheResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        Self::initialize(conn)
    }

    /// Creates an in-memory cache (for testing)
    pub fn open_in_memory() -> CacheResult<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> CacheResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS prices (
                key        TEXT PRIMARY KEY,
                price      REAL NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl PriceCache for SqliteCache {
    fn get(&self, key: &str) -> CacheResult<Option<f64>> {
        let conn = self.conn.lock().unwrap();
        let price = conn
            .query_row("SELECT price FROM prices WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(price)
    }

    fn set(&self, key: &str, price: f64) -> CacheResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO prices (key, price, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET price = ?2, updated_at = ?3",
            params![key, price, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn observe(&self, key: &str, price: f64) -> CacheResult<PriceChange> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let previous: Option<f64> = tx
            .query_row("SELECT price FROM prices WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;

        let change = match previous {
            None => PriceChange::New,
            Some(p) if same_price(p, price) => PriceChange::Unchanged,
            Some(p) => PriceChange::Changed { previous: p },
        };

        if !matches!(change, PriceChange::Unchanged) {
            tx.execute(
                "INSERT INTO prices (key, price, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET price = ?2, updated_at = ?3",
                params![key, price, Utc::now().to_rfc3339()],
            )?;
        }

        tx.commit()?;
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_new() {
        let cache = SqliteCache::open_in_memory().unwrap();
        assert_eq!(cache.observe("product:scaler", 120.0).unwrap(), PriceChange::New);
        assert_eq!(cache.get("product:scaler").unwrap(), Some(120.0));
    }

    #[test]
    fn unchanged_price_leaves_cache_untouched() {
        let cache = SqliteCache::open_in_memory().unwrap();
        cache.observe("product:scaler", 120.0).unwrap();
        assert_eq!(
            cache.observe("product:scaler", 120.0).unwrap(),
            PriceChange::Unchanged
        );
        assert_eq!(cache.get("product:scaler").unwrap(), Some(120.0));
    }

    #[test]
    fn changed_price_overwrites() {
        let cache = SqliteCache::open_in_memory().unwrap();
        cache.observe("product:scaler", 120.0).unwrap();
        assert_eq!(
            cache.observe("product:scaler", 99.5).unwrap(),
            PriceChange::Changed { previous: 120.0 }
        );
        assert_eq!(cache.get("product:scaler").unwrap(), Some(99.5));
    }

    #[test]
    fn near_equal_prices_count_as_unchanged() {
        let cache = SqliteCache::open_in_memory().unwrap();
        cache.set("product:mirror", 35.5).unwrap();
        assert_eq!(
            cache.observe("product:mirror", 35.5 + 1e-9).unwrap(),
            PriceChange::Unchanged
        );
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        {
            let cache = SqliteCache::open(&path).unwrap();
            cache.set("product:kit", 250.0).unwrap();
        }
        let cache = SqliteCache::open(&path).unwrap();
        assert_eq!(cache.get("product:kit").unwrap(), Some(250.0));
    }
}
