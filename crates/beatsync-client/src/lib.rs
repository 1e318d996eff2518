//! BeatSync Client - Session-side synchronization layer
//!
//! Everything one browser session needs to participate in beat discovery:
//! a TTL-bounded cache over the gateway's community listing, a scanner for
//! the session's own persisted beat records, a merge layer producing one
//! deduplicated feed, and the best-effort trigger that pushes local beats
//! to the gateway so other sessions can discover them.

pub mod cache;
pub mod error;
pub mod feed;
pub mod http;
pub mod local;
pub mod sync;

pub use cache::{DEFAULT_DISCOVERY_TTL, DiscoveryCache};
pub use error::{ClientError, ClientResult};
pub use feed::{BeatFeed, merge_feeds, spawn_periodic_refresh};
pub use http::{BeatPush, CommunityFetch, GatewayClient};
pub use local::{LOCAL_BEAT_KEY_PREFIXES, LocalScan, LocalStore, scan_local_beats};
pub use sync::{SyncOutcome, sync_local_beats};
