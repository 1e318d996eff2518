//! Session-local persisted storage and the beat scanner.
//!
//! A redb file plays the part of the browser's persisted key-value
//! storage. The beat keys are owned by the upload flow; this module only
//! reads them, except for the raw write path the upload flow (and tests)
//! use to seed entries.

use crate::error::ClientResult;
use beatsync_common::{BeatRecord, BeatSource, ClientConfig, ScanReport, SkipReason};
use redb::{Database, ReadableTable, TableDefinition};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Key prefixes under which the upload flow persists beat records.
///
/// `producer_beats_{producerId}` holds an array of records,
/// `uploaded_beat_{id}` a single record; the scanner accepts either shape
/// under either prefix.
pub const LOCAL_BEAT_KEY_PREFIXES: [&str; 2] = ["producer_beats_", "uploaded_beat_"];

const LOCAL_KV: TableDefinition<&str, &str> = TableDefinition::new("local_kv");

/// The session's persisted key-value store.
pub struct LocalStore {
    db: Database,
}

impl LocalStore {
    /// Open (or create) the store at the given path.
    ///
    /// # Errors
    /// Returns [`crate::ClientError`] if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Create the table eagerly so later read txns don't fail
        let write_txn = db.begin_write()?;
        {
            let _t = write_txn.open_table(LOCAL_KV)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Open the store at the path named by client configuration.
    ///
    /// # Errors
    /// Returns [`crate::ClientError`] if the database cannot be opened.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::open(&config.local_db_path)
    }

    /// Raw write path, used by the upload flow; the sync layer never
    /// writes beat keys itself.
    ///
    /// # Errors
    /// Returns [`crate::ClientError`] if the write transaction fails.
    pub fn put_raw(&self, key: &str, value: &str) -> ClientResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(LOCAL_KV)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Read one raw value.
    ///
    /// # Errors
    /// Returns [`crate::ClientError`] if the read transaction fails.
    pub fn get_raw(&self, key: &str) -> ClientResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCAL_KV)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    /// Enumerate all key/value pairs, in key order.
    fn entries(&self) -> ClientResult<Vec<(String, String)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCAL_KV)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            result.push((entry.0.value().to_string(), entry.1.value().to_string()));
        }
        Ok(result)
    }
}

/// Result of one local scan: the valid beats plus drop counts.
#[derive(Debug)]
pub struct LocalScan {
    pub beats: Vec<BeatRecord>,
    pub report: ScanReport,
}

/// Scan the session store for beat records this session owns.
///
/// Keys matching [`LOCAL_BEAT_KEY_PREFIXES`] are parsed as JSON (array of
/// candidates or a single object). A parse failure skips that key and the
/// scan continues; candidates missing `id` or `title` are dropped and
/// counted. The aggregate is deduplicated by id (first occurrence wins,
/// in key order) and tagged `source = local`.
///
/// # Errors
/// Returns [`crate::ClientError`] only if the store itself cannot be
/// enumerated; per-key failures never abort the scan.
pub fn scan_local_beats(store: &LocalStore) -> ClientResult<LocalScan> {
    let mut report = ScanReport::default();
    let mut seen = HashSet::new();
    let mut beats: Vec<BeatRecord> = Vec::new();

    for (key, value) in store.entries()? {
        if !LOCAL_BEAT_KEY_PREFIXES.iter().any(|p| key.starts_with(p)) {
            continue;
        }

        let parsed: serde_json::Value = match serde_json::from_str(&value) {
            Ok(v) => v,
            Err(e) => {
                warn!("Skipping unparseable local entry '{}': {}", key, e);
                report.note(&SkipReason::Unparseable(e.to_string()));
                continue;
            }
        };

        let candidates = match parsed {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };

        for candidate in candidates {
            let record = match serde_json::from_value::<BeatRecord>(candidate) {
                Ok(record) => record,
                Err(e) => {
                    report.note(&SkipReason::Unparseable(e.to_string()));
                    continue;
                }
            };
            match record.validate() {
                Ok(mut record) => {
                    if seen.insert(record.id.clone()) {
                        record.source = Some(BeatSource::Local);
                        beats.push(record);
                    }
                }
                Err(reason) => report.note(&reason),
            }
        }
    }

    debug!(
        "Local scan found {} beats ({} malformed, {} unparseable skipped)",
        beats.len(),
        report.skipped_malformed,
        report.skipped_unparseable
    );
    Ok(LocalScan { beats, report })
}
