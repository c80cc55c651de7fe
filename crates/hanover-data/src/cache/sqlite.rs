//! SQLite cache for built panels.
//!
//! Security panels and fundamentals are stored as JSON blobs keyed by feed name and the
//! exact query range. A lookup only hits when the same range was stored before.

use crate::calendar::{DateRange, Frequency};
use crate::error::Result;
use crate::feed::Feed;
use crate::fundamentals::FundamentalsPanel;
use crate::panel::SecurityPanel;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// SQLite cache for built panels.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Open or create a cache database at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS panels (
                feed TEXT NOT NULL,
                start TEXT NOT NULL,
                end TEXT NOT NULL,
                data TEXT NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (feed, start, end)
            )",
            [],
        )?;
        Ok(())
    }

    /// Load a cached value for `feed` over exactly `range`.
    pub fn get<T: DeserializeOwned>(&self, feed: Feed, range: &DateRange) -> Result<Option<T>> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM panels WHERE feed = ?1 AND start = ?2 AND end = ?3",
                params![feed.name(), range.start().to_string(), range.end().to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let value = data.map(|d| serde_json::from_str(&d)).transpose()?;
        tracing::debug!(feed = feed.name(), range = %range, hit = value.is_some(), "cache lookup");
        Ok(value)
    }

    /// Store a value for `feed` over `range`, replacing any previous entry.
    pub fn put<T: Serialize>(&self, feed: Feed, range: &DateRange, value: &T) -> Result<()> {
        let data = serde_json::to_string(value)?;
        let cached_at = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO panels (feed, start, end, data, cached_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                feed.name(),
                range.start().to_string(),
                range.end().to_string(),
                data,
                cached_at
            ],
        )?;
        Ok(())
    }

    /// Cached security panel at the base frequency of `frequency`.
    pub fn get_security_panel(
        &self,
        frequency: Frequency,
        range: &DateRange,
    ) -> Result<Option<SecurityPanel>> {
        self.get(Feed::securities(frequency), range)
    }

    /// Store a security panel.
    pub fn put_security_panel(&self, range: &DateRange, panel: &SecurityPanel) -> Result<()> {
        self.put(Feed::securities(panel.frequency()), range, panel)
    }

    /// Cached fundamentals panel.
    pub fn get_fundamentals(&self, range: &DateRange) -> Result<Option<FundamentalsPanel>> {
        self.get(Feed::Fundamentals, range)
    }

    /// Store a fundamentals panel.
    pub fn put_fundamentals(&self, range: &DateRange, panel: &FundamentalsPanel) -> Result<()> {
        self.put(Feed::Fundamentals, range, panel)
    }

    /// Clear all cached data.
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM panels", [])?;
        Ok(())
    }

    /// Clear cached data of one feed.
    pub fn clear_feed(&self, feed: Feed) -> Result<()> {
        self.conn
            .execute("DELETE FROM panels WHERE feed = ?1", params![feed.name()])?;
        Ok(())
    }

    /// Get cache statistics.
    pub fn get_stats(&self) -> Result<CacheStats> {
        let mut stmt = self.conn.prepare(
            "SELECT feed, COUNT(*), SUM(LENGTH(data)) FROM panels GROUP BY feed ORDER BY feed",
        )?;
        let feeds = stmt
            .query_map([], |row| {
                Ok(FeedStats {
                    feed: row.get(0)?,
                    entries: row.get::<_, i64>(1)? as usize,
                    bytes: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(CacheStats { feeds })
    }
}

/// Entries stored for one feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStats {
    /// Feed name
    pub feed: String,
    /// Number of cached ranges
    pub entries: usize,
    /// Size of the stored JSON in bytes
    pub bytes: usize,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Per-feed statistics
    pub feeds: Vec<FeedStats>,
}

impl CacheStats {
    /// Total number of cached entries.
    pub fn total_entries(&self) -> usize {
        self.feeds.iter().map(|f| f.entries).sum()
    }

    /// Total size of the stored data in bytes.
    pub fn total_bytes(&self) -> usize {
        self.feeds.iter().map(|f| f.bytes).sum()
    }
}
