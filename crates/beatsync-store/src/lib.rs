//! BeatSync Store - Server-side ephemeral metadata cache
//!
//! Holds the most recently pushed version of each beat's metadata, keyed
//! by beat id, with no persistence and no expiry. Records are lost on
//! process restart by design; the next client sync re-pushes them.

pub mod discovery;
pub mod store;

pub use discovery::{DISCOVERY_PAGE_SIZE, DiscoveryPage, assemble_community_beats};
pub use store::{BeatStore, CacheEntry, MemoryStore, StoreError, StoreResult};
