//! Community discovery assembly.
//!
//! Turns the raw store enumeration into the list served by
//! `GET /community-beats`: validity-filtered, annotated as community,
//! deduplicated, active-only, recency-sorted, and truncated to a page.

use crate::store::CacheEntry;
use beatsync_common::{BeatRecord, BeatSource, ScanReport};
use std::collections::HashSet;

pub use beatsync_common::DISCOVERY_PAGE_SIZE;

/// Result of one discovery assembly pass.
#[derive(Debug)]
pub struct DiscoveryPage {
    pub beats: Vec<BeatRecord>,
    /// Counts of entries dropped as malformed, for logging.
    pub report: ScanReport,
}

/// Assemble the community listing from a store enumeration.
///
/// Order of operations matters and is part of the contract:
/// validity filter, community annotation (`discoveredAt` defaults to
/// `now`), dedup by id first-occurrence-wins, drop `isActive == false`,
/// stable sort by best timestamp descending, truncate to `limit`.
#[must_use]
pub fn assemble_community_beats(
    entries: Vec<CacheEntry>,
    limit: usize,
    now: i64,
) -> DiscoveryPage {
    let mut report = ScanReport::default();
    let mut seen = HashSet::new();
    let mut beats: Vec<BeatRecord> = Vec::new();

    for entry in entries {
        let mut record = match entry.record.validate() {
            Ok(record) => record,
            Err(reason) => {
                report.note(&reason);
                continue;
            }
        };

        record.source = Some(BeatSource::Community);
        if record.discovered_at.is_none() {
            record.discovered_at = Some(now);
        }

        // Dedup before the active filter: a later duplicate never
        // resurrects an id whose first occurrence was inactive.
        if !seen.insert(record.id.clone()) {
            continue;
        }
        if !record.is_active() {
            continue;
        }

        beats.push(record);
    }

    beats.sort_by_key(|b| std::cmp::Reverse(b.sort_timestamp()));
    beats.truncate(limit);

    DiscoveryPage { beats, report }
}
