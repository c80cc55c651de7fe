//! Cache manager for built panels.
//!
//! Opens the SQLite panel cache at a platform-specific default location.

use hanover_data::cache::SqliteCache;
use hanover_data::error::DataError;
use std::path::{Path, PathBuf};

/// Get the default cache directory path.
///
/// Uses platform-specific cache directories:
/// - Linux: `~/.cache/hanover/`
/// - macOS: `~/Library/Caches/hanover/`
/// - Windows: `%LOCALAPPDATA%\hanover\cache\`
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hanover")
}

/// Get the default cache database path.
pub(crate) fn default_cache_path() -> PathBuf {
    default_cache_dir().join("hanover.db")
}

/// Open the cache at `path` or the default location, creating the directory if needed.
pub(crate) fn open_cache(path: Option<&Path>) -> Result<SqliteCache, DataError> {
    let cache_path = path.map_or_else(default_cache_path, Path::to_path_buf);

    // Ensure parent directory exists
    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::debug!(path = %cache_path.display(), "opening panel cache");
    SqliteCache::new(&cache_path)
}
