//! Persistent caching of built panels.

pub mod sqlite;

pub use sqlite::{CacheStats, FeedStats, SqliteCache};
