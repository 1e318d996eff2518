//! Process-wide metadata store.
//!
//! One store per process, shared across all request handlers; there is no
//! cross-instance coherency. Writes are whole-record overwrites (no
//! field-level merge), so the last write observed by the process wins.
//! Validation is a read-side concern; `put` accepts anything.

use beatsync_common::{BeatRecord, now_ms};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Error type for store operations.
///
/// The in-memory store cannot fail, but the trait keeps enumeration
/// fallible so alternative backends (and the discovery endpoint's failure
/// path) stay expressible.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store enumeration failed: {0}")]
    Enumeration(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A stored beat record plus its server-side ingestion time.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub record: BeatRecord,
    /// Ingestion time, epoch milliseconds.
    pub timestamp: i64,
}

/// Server-side cache of pushed beat metadata, keyed by beat id.
///
/// Injected explicitly rather than held as a module-level singleton so
/// tests can instantiate isolated stores.
pub trait BeatStore: Send + Sync {
    /// Unconditionally replace any existing entry for `id`, stamping the
    /// current time. A push with less complete data still overwrites a
    /// more complete prior entry; callers send whole records.
    fn put(&self, id: &str, record: BeatRecord);

    /// Look up the entry for `id`.
    fn get(&self, id: &str) -> Option<CacheEntry>;

    /// Enumerate all entries for the discovery endpoint.
    ///
    /// # Errors
    /// Returns [`StoreError`] if the backend cannot enumerate.
    fn values(&self) -> StoreResult<Vec<CacheEntry>>;

    /// Number of entries currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Entries are stored under `beat_{id}`.
fn cache_key(id: &str) -> String {
    format!("beat_{id}")
}

/// The in-process `BeatStore`: a lock-guarded map, lazily empty, no
/// persistence.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BeatStore for MemoryStore {
    fn put(&self, id: &str, record: BeatRecord) {
        let entry = CacheEntry {
            record,
            timestamp: now_ms(),
        };
        self.entries.write().insert(cache_key(id), entry);
    }

    fn get(&self, id: &str) -> Option<CacheEntry> {
        self.entries.read().get(&cache_key(id)).cloned()
    }

    fn values(&self) -> StoreResult<Vec<CacheEntry>> {
        Ok(self.entries.read().values().cloned().collect())
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}
