//! Request-scoped cache policy and the engine's memo tables.

use hanover_data::{DateRange, Frequency};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Per-request cache switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Reload raw panels from the source, bypassing the memo and the panel cache
    pub requery: bool,
    /// Recompute regression estimates and sorts
    pub reestimate: bool,
}

impl CachePolicy {
    /// Reuse everything.
    pub const fn cached() -> Self {
        Self {
            requery: false,
            reestimate: false,
        }
    }

    /// Reload panels and recompute everything derived from them.
    pub const fn refresh() -> Self {
        Self {
            requery: true,
            reestimate: true,
        }
    }

    /// Keep panels, recompute estimates and sorts.
    pub const fn reestimate() -> Self {
        Self {
            requery: false,
            reestimate: true,
        }
    }

    /// Whether derived results must be recomputed.
    pub const fn recompute(&self) -> bool {
        self.requery || self.reestimate
    }
}

/// Key of a memoized result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey {
    /// Producing step
    pub method: &'static str,
    /// Requested range
    pub range: DateRange,
    /// Panel frequency
    pub frequency: Frequency,
    /// Step parameters
    pub params: String,
}

impl MemoKey {
    /// Build a key.
    pub fn new(
        method: &'static str,
        range: &DateRange,
        frequency: Frequency,
        params: impl fmt::Display,
    ) -> Self {
        Self {
            method,
            range: *range,
            frequency,
            params: params.to_string(),
        }
    }
}

impl fmt::Display for MemoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{} {} {}]", self.method, self.frequency, self.range, self.params)
    }
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoStats {
    /// Lookups answered from memory
    pub hits: usize,
    /// Lookups that had to compute
    pub misses: usize,
}

/// Results kept for the lifetime of an engine.
#[derive(Debug)]
pub(crate) struct Memo<T> {
    entries: HashMap<MemoKey, Arc<T>>,
    stats: MemoStats,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            stats: MemoStats::default(),
        }
    }
}

impl<T> Memo<T> {
    /// Stored value unless `bypass` is set; counts a miss otherwise.
    pub(crate) fn lookup(&mut self, key: &MemoKey, bypass: bool) -> Option<Arc<T>> {
        let found = if bypass {
            None
        } else {
            self.entries.get(key).cloned()
        };
        match found {
            Some(v) => {
                self.stats.hits += 1;
                tracing::debug!(key = %key, "memo hit");
                Some(v)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store a value and hand back a shared handle.
    pub(crate) fn store(&mut self, key: MemoKey, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.entries.insert(key, Arc::clone(&value));
        value
    }

    pub(crate) const fn stats(&self) -> MemoStats {
        self.stats
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
