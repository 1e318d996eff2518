//! Bridge/merge layer: one unified beat feed.
//!
//! Combines the session's own local beats with the community beats learned
//! from the discovery cache into a single ordered, deduplicated list.
//! Local records always win a duplicate id, regardless of timestamps.

use crate::cache::DiscoveryCache;
use crate::http::BeatPush;
use crate::local::{LocalStore, scan_local_beats};
use crate::sync;
use beatsync_common::BeatRecord;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Recency key used inside a priority band: `createdAt`, else
/// `discoveredAt`, else the legacy `timestamp`, else epoch zero.
fn feed_recency(beat: &BeatRecord) -> i64 {
    beat.created_at
        .or(beat.discovered_at)
        .or(beat.timestamp)
        .unwrap_or(0)
}

/// Merge local and community beats into one deduplicated feed.
///
/// Community records whose id also appears locally are excluded, then the
/// local band (priority 1) precedes the community band (priority 2), each
/// band sorted by recency descending. The sort is stable, so ties keep
/// their scan/listing order.
#[must_use]
pub fn merge_feeds(local: Vec<BeatRecord>, community: Vec<BeatRecord>) -> Vec<BeatRecord> {
    let local_ids: HashSet<String> = local.iter().map(|b| b.id.clone()).collect();

    let mut ranked: Vec<(u8, BeatRecord)> = local.into_iter().map(|b| (1, b)).collect();
    ranked.extend(
        community
            .into_iter()
            .filter(|b| !local_ids.contains(&b.id))
            .map(|b| (2, b)),
    );

    ranked.sort_by_key(|(priority, beat)| (*priority, Reverse(feed_recency(beat))));
    ranked.into_iter().map(|(_, beat)| beat).collect()
}

/// The session's unified feed: local store scanner + discovery cache.
pub struct BeatFeed {
    local: Arc<LocalStore>,
    cache: Arc<DiscoveryCache>,
}

impl BeatFeed {
    #[must_use]
    pub fn new(local: Arc<LocalStore>, cache: Arc<DiscoveryCache>) -> Self {
        Self { local, cache }
    }

    /// Current merged feed.
    ///
    /// # Errors
    /// Returns [`crate::ClientError`] if the local store cannot be
    /// scanned; a community fetch failure only degrades to cached (or no)
    /// community beats.
    pub async fn beats(&self) -> crate::ClientResult<Vec<BeatRecord>> {
        let scan = scan_local_beats(&self.local)?;
        let community = self.cache.get_beats().await;
        Ok(merge_feeds(scan.beats, community))
    }
}

/// Spawn the periodic refresh loop: every `period`, re-push local beats to
/// the gateway and warm the discovery cache. The first tick fires
/// immediately, covering the on-startup sync. Failures are logged and the
/// loop keeps running.
pub fn spawn_periodic_refresh(
    feed: Arc<BeatFeed>,
    pusher: Arc<dyn BeatPush>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match sync::sync_local_beats(&feed.local, pusher.as_ref()).await {
                Ok(outcome) => {
                    if outcome.pushed > 0 || outcome.failed > 0 {
                        info!(
                            "Periodic sync pushed {} beats ({} failed)",
                            outcome.pushed, outcome.failed
                        );
                    }
                }
                Err(e) => warn!("Periodic sync could not scan local store: {}", e),
            }
            // TTL-gated; within a fresh window this is a no-op.
            let _ = feed.cache.get_beats().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DiscoveryCache;
    use crate::error::ClientResult;
    use crate::http::CommunityFetch;
    use async_trait::async_trait;
    use beatsync_common::BeatSource;

    fn local(id: &str, title: &str, created_at: i64) -> BeatRecord {
        let mut beat = BeatRecord::new(id, title);
        beat.source = Some(BeatSource::Local);
        beat.created_at = Some(created_at);
        beat
    }

    fn community(id: &str, title: &str, created_at: i64) -> BeatRecord {
        let mut beat = BeatRecord::new(id, title);
        beat.source = Some(BeatSource::Community);
        beat.created_at = Some(created_at);
        beat
    }

    #[test]
    fn test_local_copy_wins_duplicate_id() {
        let merged = merge_feeds(
            vec![local("9", "Local Beat", 100)],
            vec![community("9", "Community Copy", 999)],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "Local Beat");
        assert_eq!(merged[0].source, Some(BeatSource::Local));
    }

    #[test]
    fn test_local_band_precedes_community_band() {
        let merged = merge_feeds(
            vec![local("l-old", "l-old", 10), local("l-new", "l-new", 20)],
            vec![community("c-new", "c-new", 999)],
        );
        let ids: Vec<&str> = merged.iter().map(|b| b.id.as_str()).collect();
        // Newer community beat still sorts after every local beat.
        assert_eq!(ids, vec!["l-new", "l-old", "c-new"]);
    }

    #[test]
    fn test_recency_falls_back_to_discovered_at() {
        let mut discovered = BeatRecord::new("d", "d");
        discovered.discovered_at = Some(500);
        let merged = merge_feeds(vec![], vec![community("c", "c", 100), discovered]);
        let ids: Vec<&str> = merged.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c"]);
    }

    struct StaticFetch(Vec<BeatRecord>);

    #[async_trait]
    impl CommunityFetch for StaticFetch {
        async fn fetch_community(&self) -> ClientResult<Vec<BeatRecord>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_feed_merges_scanner_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path().join("local.redb")).unwrap());
        store
            .put_raw("producer_beats_0xABC", r#"[{"id":"9","title":"Local Beat"}]"#)
            .unwrap();

        let fetch = Arc::new(StaticFetch(vec![
            community("9", "Community Copy", 999),
            community("2", "Other", 500),
        ]));
        let cache = Arc::new(DiscoveryCache::new(fetch));
        let feed = BeatFeed::new(store, cache);

        let beats = feed.beats().await.unwrap();
        assert_eq!(beats.len(), 2);
        // Exactly one entry for id 9, and it is the local one.
        assert_eq!(beats[0].id, "9");
        assert_eq!(beats[0].source, Some(BeatSource::Local));
        assert_eq!(beats[1].id, "2");
    }
}
