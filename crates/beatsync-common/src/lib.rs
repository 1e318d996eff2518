//! BeatSync Common - Shared types and utilities
//!
//! This crate provides the beat record model, validation, cover-image
//! normalization, wire envelopes, and configuration structs used across
//! all BeatSync components.

pub mod api;
pub mod config;
pub mod types;

pub use api::{CommunityBeatsResponse, DISCOVERY_PAGE_SIZE, PushAck, SyncAck, SyncBeatRequest};
pub use config::{ClientConfig, GatewayConfig};
pub use types::*;
