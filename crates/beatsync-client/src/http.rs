//! HTTP client for the gateway's sync endpoints.
//!
//! The fetch and push operations are behind traits so the discovery cache
//! and sync trigger can be tested with in-memory mocks instead of a
//! running gateway.

use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use beatsync_common::{BeatRecord, ClientConfig, CommunityBeatsResponse, PushAck};
use reqwest::StatusCode;
use std::time::Duration;

/// Read side of the gateway: the community discovery listing.
#[async_trait]
pub trait CommunityFetch: Send + Sync {
    /// Fetch the current community beat listing.
    ///
    /// # Errors
    /// Returns [`ClientError`] on transport failure or when the response
    /// is unusable (`success:false` or an unparseable body).
    async fn fetch_community(&self) -> ClientResult<Vec<BeatRecord>>;
}

/// Write side of the gateway: the metadata ingress.
#[async_trait]
pub trait BeatPush: Send + Sync {
    /// Push one beat record, overwriting any prior entry for its id.
    ///
    /// # Errors
    /// Returns [`ClientError`] on transport failure or a non-success
    /// acknowledgement.
    async fn push_beat(&self, record: &BeatRecord) -> ClientResult<()>;
}

/// HTTP implementation of both gateway seams.
pub struct GatewayClient {
    base_url: String,
    http: reqwest::Client,
}

impl GatewayClient {
    /// Build a client from the session configuration.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Direct metadata egress lookup: `GET /beat-metadata/{id}`.
    ///
    /// A 404 is a distinct "not found" signal, returned as `None`.
    ///
    /// # Errors
    /// Returns [`ClientError`] on transport failure or a non-404 error
    /// status.
    pub async fn fetch_beat(&self, id: &str) -> ClientResult<Option<BeatRecord>> {
        let url = format!("{}/beat-metadata/{id}", self.base_url);
        let resp = self.http.get(&url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let record: BeatRecord = resp.error_for_status()?.json().await?;
        Ok(Some(record))
    }
}

#[async_trait]
impl CommunityFetch for GatewayClient {
    async fn fetch_community(&self) -> ClientResult<Vec<BeatRecord>> {
        let url = format!("{}/community-beats", self.base_url);
        let resp = self.http.get(&url).send().await?;
        let body: CommunityBeatsResponse = resp.json().await?;
        if body.success {
            Ok(body.beats)
        } else {
            Err(ClientError::Discovery(
                body.error
                    .unwrap_or_else(|| "gateway reported failure".to_string()),
            ))
        }
    }
}

#[async_trait]
impl BeatPush for GatewayClient {
    async fn push_beat(&self, record: &BeatRecord) -> ClientResult<()> {
        let url = format!("{}/beat-metadata/{}", self.base_url, record.id);
        let resp = self.http.post(&url).json(record).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::PushRejected(format!("status {status}")));
        }
        let ack: PushAck = resp.json().await?;
        if ack.success {
            Ok(())
        } else {
            Err(ClientError::PushRejected(
                "gateway reported failure".to_string(),
            ))
        }
    }
}
