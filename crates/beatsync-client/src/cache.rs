//! Client discovery cache.
//!
//! Time-bounded wrapper over the gateway's community listing: within the
//! TTL window, repeated reads are served from memory with zero network
//! calls. A failed refresh keeps the previous contents and does not
//! advance the refresh clock, so the next read retries immediately
//! instead of waiting out a full TTL on stale data.

use crate::http::CommunityFetch;
use beatsync_common::{BeatRecord, ClientConfig};
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default time-to-live of the discovery cache.
pub const DEFAULT_DISCOVERY_TTL: Duration = Duration::from_secs(300);

struct CacheState {
    beats: HashMap<String, BeatRecord>,
    last_refreshed: Option<Instant>,
}

/// TTL-bounded cache of community beats, keyed by beat id.
///
/// Shared across all consumers within one session. Concurrent refreshes
/// are not guarded; a stale in-flight refresh completes and is reconciled
/// per record, last write wins. Optimistic inserts via [`Self::add_beat`]
/// survive refreshes until the gateway serves the same id or the entry is
/// removed or cleared.
pub struct DiscoveryCache {
    fetcher: Arc<dyn CommunityFetch>,
    state: RwLock<CacheState>,
    ttl: Duration,
}

impl DiscoveryCache {
    #[must_use]
    pub fn new(fetcher: Arc<dyn CommunityFetch>) -> Self {
        Self::with_ttl(fetcher, DEFAULT_DISCOVERY_TTL)
    }

    #[must_use]
    pub fn with_ttl(fetcher: Arc<dyn CommunityFetch>, ttl: Duration) -> Self {
        Self {
            fetcher,
            state: RwLock::new(CacheState {
                beats: HashMap::new(),
                last_refreshed: None,
            }),
            ttl,
        }
    }

    /// Cache with the TTL taken from client configuration.
    #[must_use]
    pub fn from_config(fetcher: Arc<dyn CommunityFetch>, config: &ClientConfig) -> Self {
        Self::with_ttl(fetcher, Duration::from_secs(config.refresh_ttl_secs))
    }

    /// Current community beats, refreshing first if the TTL has elapsed.
    ///
    /// Returned filtered to active records and sorted by recency
    /// descending. Never fails: a refresh error falls back to whatever is
    /// cached (possibly nothing).
    pub async fn get_beats(&self) -> Vec<BeatRecord> {
        if self.is_stale() {
            self.refresh().await;
        }

        let state = self.state.read();
        let mut beats: Vec<BeatRecord> = state
            .beats
            .values()
            .filter(|b| b.is_active())
            .cloned()
            .collect();
        beats.sort_by_key(|b| Reverse(b.sort_timestamp()));
        beats
    }

    /// Optimistic local insert, bypassing the network.
    pub fn add_beat(&self, beat: BeatRecord) {
        self.state.write().beats.insert(beat.id.clone(), beat);
    }

    /// Optimistic local removal, bypassing the network.
    pub fn remove_beat(&self, id: &str) -> Option<BeatRecord> {
        self.state.write().beats.remove(id)
    }

    /// Drop all cached beats and force a refresh on the next read.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.beats.clear();
        state.last_refreshed = None;
    }

    fn is_stale(&self) -> bool {
        self.state
            .read()
            .last_refreshed
            .is_none_or(|at| at.elapsed() > self.ttl)
    }

    async fn refresh(&self) {
        match self.fetcher.fetch_community().await {
            Ok(beats) => {
                let fetched = beats.len();
                let mut state = self.state.write();
                // Merge, do not replace: a fetched record overwrites the
                // cached copy of its id, while optimistic inserts without
                // a fetched counterpart stay cached.
                for beat in beats.into_iter().filter(BeatRecord::is_valid) {
                    state.beats.insert(beat.id.clone(), beat);
                }
                state.last_refreshed = Some(Instant::now());
                debug!("Discovery cache refreshed with {} beats", fetched);
            }
            Err(e) => {
                // Keep prior contents; leaving last_refreshed untouched
                // makes the next read retry instead of waiting a full TTL.
                warn!("Discovery refresh failed, serving cached beats: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClientError, ClientResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct CountingFetch {
        calls: AtomicUsize,
        beats: Vec<BeatRecord>,
    }

    impl CountingFetch {
        fn new(beats: Vec<BeatRecord>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                beats,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CommunityFetch for CountingFetch {
        async fn fetch_community(&self) -> ClientResult<Vec<BeatRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.beats.clone())
        }
    }

    struct FlakyFetch {
        calls: AtomicUsize,
        fail_next: AtomicBool,
        beats: Vec<BeatRecord>,
    }

    #[async_trait]
    impl CommunityFetch for FlakyFetch {
        async fn fetch_community(&self) -> ClientResult<Vec<BeatRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next.swap(false, Ordering::SeqCst) {
                Err(ClientError::Discovery("gateway unreachable".into()))
            } else {
                Ok(self.beats.clone())
            }
        }
    }

    #[tokio::test]
    async fn test_fresh_reads_make_zero_network_calls() {
        let fetch = CountingFetch::new(vec![BeatRecord::new("1", "a")]);
        let cache = DiscoveryCache::new(fetch.clone());

        for _ in 0..5 {
            let beats = cache.get_beats().await;
            assert_eq!(beats.len(), 1);
        }
        assert_eq!(fetch.calls(), 1);
    }

    #[tokio::test]
    async fn test_clear_forces_refresh() {
        let fetch = CountingFetch::new(vec![BeatRecord::new("1", "a")]);
        let cache = DiscoveryCache::new(fetch.clone());

        cache.get_beats().await;
        cache.clear();
        cache.get_beats().await;
        assert_eq!(fetch.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_retries_on_next_read() {
        let fetch = Arc::new(FlakyFetch {
            calls: AtomicUsize::new(0),
            fail_next: AtomicBool::new(true),
            beats: vec![BeatRecord::new("1", "a")],
        });
        let cache = DiscoveryCache::new(fetch.clone());

        // First read fails; nothing cached, refresh clock not advanced.
        assert!(cache.get_beats().await.is_empty());
        // Second read retries immediately rather than waiting out the TTL.
        let beats = cache.get_beats().await;
        assert_eq!(beats.len(), 1);
        assert_eq!(fetch.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_contents() {
        let fetch = Arc::new(FlakyFetch {
            calls: AtomicUsize::new(0),
            fail_next: AtomicBool::new(true),
            beats: vec![],
        });
        let cache = DiscoveryCache::with_ttl(fetch, Duration::ZERO);
        cache.add_beat(BeatRecord::new("9", "kept"));

        let beats = cache.get_beats().await;
        assert_eq!(beats.len(), 1);
        assert_eq!(beats[0].id, "9");
    }

    #[tokio::test]
    async fn test_reads_filter_inactive_and_sort_by_recency() {
        let mut old = BeatRecord::new("old", "old");
        old.created_at = Some(100);
        let mut fresh = BeatRecord::new("fresh", "fresh");
        fresh.created_at = Some(900);
        let mut inactive = BeatRecord::new("off", "off");
        inactive.is_active = Some(false);

        let fetch = CountingFetch::new(vec![old, inactive, fresh]);
        let cache = DiscoveryCache::new(fetch);

        let beats = cache.get_beats().await;
        let ids: Vec<&str> = beats.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["fresh", "old"]);
    }

    #[tokio::test]
    async fn test_refresh_keeps_optimistic_insert() {
        let fetch = CountingFetch::new(vec![BeatRecord::new("net", "from gateway")]);
        let cache = DiscoveryCache::new(fetch.clone());

        // Insert before the cache has ever refreshed; the first read is
        // stale and refreshes, which must not wipe the insert.
        cache.add_beat(BeatRecord::new("opt", "optimistic"));

        let beats = cache.get_beats().await;
        assert_eq!(fetch.calls(), 1);
        let ids: Vec<&str> = beats.iter().map(|b| b.id.as_str()).collect();
        assert!(ids.contains(&"opt"));
        assert!(ids.contains(&"net"));
    }

    #[tokio::test]
    async fn test_refresh_overwrites_optimistic_copy_of_fetched_id() {
        let mut served = BeatRecord::new("1", "gateway copy");
        served.genre = Some("amapiano".into());
        let fetch = CountingFetch::new(vec![served]);
        let cache = DiscoveryCache::new(fetch);

        cache.add_beat(BeatRecord::new("1", "optimistic copy"));

        let beats = cache.get_beats().await;
        assert_eq!(beats.len(), 1);
        assert_eq!(beats[0].title, "gateway copy");
    }

    #[tokio::test]
    async fn test_from_config_honors_refresh_ttl() {
        let fetch = CountingFetch::new(vec![BeatRecord::new("1", "a")]);
        let config = ClientConfig {
            refresh_ttl_secs: 0,
            ..ClientConfig::default()
        };
        let cache = DiscoveryCache::from_config(fetch.clone(), &config);

        // Zero TTL means every read is stale and refetches.
        cache.get_beats().await;
        cache.get_beats().await;
        assert_eq!(fetch.calls(), 2);
    }

    #[tokio::test]
    async fn test_mutation_hooks() {
        let fetch = CountingFetch::new(vec![]);
        let cache = DiscoveryCache::new(fetch);

        cache.add_beat(BeatRecord::new("1", "a"));
        assert_eq!(cache.get_beats().await.len(), 1);

        let removed = cache.remove_beat("1");
        assert_eq!(removed.unwrap().title, "a");
        assert!(cache.get_beats().await.is_empty());
    }
}
