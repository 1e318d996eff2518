//! JSON wire envelopes shared by the gateway and the session client.
//!
//! Browser sessions over-distinguish success with explicit flags, so the
//! envelopes carry a `success` boolean rather than relying on status codes
//! alone; a failed discovery is `{success:false, beats:[], count:0}` and
//! never a partial list flagged as success.

use crate::types::BeatRecord;
use serde::{Deserialize, Serialize};

/// Fixed page size of the community discovery listing.
pub const DISCOVERY_PAGE_SIZE: usize = 20;

/// Acknowledgement for a metadata push.
#[derive(Debug, Serialize, Deserialize)]
pub struct PushAck {
    pub success: bool,
}

/// Body of `POST /sync-beat`, the manual/alternate push entry point.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncBeatRequest {
    pub beat_id: String,
    pub beat_data: BeatRecord,
}

/// Acknowledgement for `POST /sync-beat`; reports the store size so a
/// client can sanity-check that its pushes are landing.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncAck {
    pub success: bool,
    pub size: usize,
}

/// Envelope for `GET /community-beats` and `GET /beat-discovery`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommunityBeatsResponse {
    pub success: bool,
    pub beats: Vec<BeatRecord>,
    pub count: usize,
    /// Generation time of this listing, epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommunityBeatsResponse {
    /// Successful listing of `beats` generated at `timestamp`.
    #[must_use]
    pub fn ok(beats: Vec<BeatRecord>, timestamp: i64) -> Self {
        Self {
            success: true,
            count: beats.len(),
            beats,
            timestamp,
            error: None,
        }
    }

    /// Explicit failure: empty list, zero count, error message.
    #[must_use]
    pub fn failed(error: impl Into<String>, timestamp: i64) -> Self {
        Self {
            success: false,
            beats: Vec::new(),
            count: 0,
            timestamp,
            error: Some(error.into()),
        }
    }
}
