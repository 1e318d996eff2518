//! Configuration types for BeatSync
//!
//! This module defines configuration structures used across components.

use crate::api::DISCOVERY_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Gateway (server-side) configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Address for the HTTP API
    pub listen: SocketAddr,
    /// Fixed page size for the community discovery listing
    pub page_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8780".parse().expect("valid default address"),
            page_size: DISCOVERY_PAGE_SIZE,
        }
    }
}

/// Session-client configuration (discovery cache, local store, sync).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Gateway base URL (e.g. `http://localhost:8780`)
    pub gateway_url: String,
    /// Discovery cache time-to-live, seconds
    pub refresh_ttl_secs: u64,
    /// Outbound request timeout, milliseconds
    pub request_timeout_ms: u64,
    /// Path of the session's persisted key-value store
    pub local_db_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:8780".to_string(),
            refresh_ttl_secs: 300,
            request_timeout_ms: 10_000,
            local_db_path: PathBuf::from("beatsync-local.redb"),
        }
    }
}
