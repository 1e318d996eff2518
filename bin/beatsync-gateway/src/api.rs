//! Axum handlers for the beat sync API.
//!
//! Ingress accepts any body that parses as a beat-shaped JSON object;
//! validation is a read-side concern. Egress and the discovery listings
//! apply one consistent convention: a missing or stored-but-invalid
//! record is a 404 on direct lookup and silently excluded from listings.

use crate::error::ApiError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use beatsync_common::{BeatRecord, CommunityBeatsResponse, PushAck, SyncAck, SyncBeatRequest, now_ms};
use beatsync_store::{BeatStore, assemble_community_beats};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};

/// Shared state for the gateway handlers.
pub struct AppState {
    pub store: Arc<dyn BeatStore>,
    /// Page size of the community listing.
    pub page_size: usize,
}

/// Build the gateway router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/beat-metadata/{id}", post(push_beat_metadata))
        .route("/beat-metadata/{id}", get(get_beat_metadata))
        .route("/sync-beat", post(sync_beat))
        .route("/community-beats", get(community_beats))
        .route("/beat-discovery", get(beat_discovery))
        .with_state(state)
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// POST /beat-metadata/{id}
///
/// Metadata ingress: overwrites any prior entry for `id` wholesale,
/// including one with more complete data. Callers send whole records.
///
/// # Errors
/// Returns `ApiError` if the body is not a beat-shaped JSON object.
pub async fn push_beat_metadata(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: String,
) -> Result<Json<PushAck>, ApiError> {
    let record: BeatRecord = serde_json::from_str(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid beat record: {e}")))?;
    state.store.put(&id, record);
    debug!("Stored beat metadata for '{}'", id);
    Ok(Json(PushAck { success: true }))
}

/// GET /beat-metadata/{id}
///
/// Metadata egress: the stored record with the cover-image fallback chain
/// applied. Miss and stored-but-invalid are both an explicit 404, never
/// conflated with an empty record.
///
/// # Errors
/// Returns a 404 `ApiError` when no valid record exists for `id`.
pub async fn get_beat_metadata(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BeatRecord>, ApiError> {
    let entry = state
        .store
        .get(&id)
        .ok_or_else(|| ApiError::not_found("not found"))?;
    let record = entry
        .record
        .validate()
        .map_err(|_| ApiError::not_found("not found"))?;
    Ok(Json(record.normalized()))
}

/// POST /sync-beat
///
/// Manual/alternate push entry point; identical effect to the ingress
/// endpoint, acknowledged with the current store size.
///
/// # Errors
/// Returns `ApiError` if the body is not a valid sync request.
pub async fn sync_beat(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<SyncAck>, ApiError> {
    let req: SyncBeatRequest = serde_json::from_str(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid sync request: {e}")))?;
    state.store.put(&req.beat_id, req.beat_data);
    Ok(Json(SyncAck {
        success: true,
        size: state.store.len(),
    }))
}

/// GET /community-beats
pub async fn community_beats(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<CommunityBeatsResponse>) {
    let page_size = state.page_size;
    list_community(&state, page_size)
}

#[derive(Debug, Deserialize)]
pub struct DiscoveryParams {
    pub limit: Option<usize>,
}

/// GET /beat-discovery?limit=N
pub async fn beat_discovery(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiscoveryParams>,
) -> (StatusCode, Json<CommunityBeatsResponse>) {
    let limit = params.limit.unwrap_or(state.page_size);
    list_community(&state, limit)
}

/// Shared listing path. An enumeration failure yields the explicit
/// failure envelope with a 5xx status, never a partial list flagged as
/// success.
fn list_community(state: &AppState, limit: usize) -> (StatusCode, Json<CommunityBeatsResponse>) {
    let now = now_ms();
    match state.store.values() {
        Ok(entries) => {
            let page = assemble_community_beats(entries, limit, now);
            if page.report.total_skipped() > 0 {
                debug!(
                    "Discovery listing dropped {} malformed entries",
                    page.report.total_skipped()
                );
            }
            (StatusCode::OK, Json(CommunityBeatsResponse::ok(page.beats, now)))
        }
        Err(e) => {
            error!("Community discovery enumeration failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CommunityBeatsResponse::failed(e.to_string(), now)),
            )
        }
    }
}
