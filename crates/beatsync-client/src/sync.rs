//! Sync trigger: push local beats to the gateway.
//!
//! Runs on startup and whenever the set of known local beats changes.
//! Each push is independent and best-effort; there is no retry/backoff
//! because the next periodic trigger simply pushes again.

use crate::error::ClientResult;
use crate::http::BeatPush;
use crate::local::{LocalStore, scan_local_beats};
use beatsync_common::BeatRecord;
use tracing::{debug, warn};

/// Counts from one sync pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub pushed: usize,
    pub failed: usize,
}

/// Scan the session store and push every local beat to the gateway.
///
/// # Errors
/// Returns [`crate::ClientError`] only if the local store cannot be
/// enumerated; individual push failures are logged and counted, never
/// propagated.
pub async fn sync_local_beats(
    store: &LocalStore,
    pusher: &dyn BeatPush,
) -> ClientResult<SyncOutcome> {
    let scan = scan_local_beats(store)?;
    Ok(push_all(pusher, &scan.beats).await)
}

/// Push a set of records, one failure never blocking the rest.
pub async fn push_all(pusher: &dyn BeatPush, beats: &[BeatRecord]) -> SyncOutcome {
    let mut outcome = SyncOutcome::default();
    for beat in beats {
        match pusher.push_beat(beat).await {
            Ok(()) => outcome.pushed += 1,
            Err(e) => {
                warn!("Failed to push beat '{}', continuing: {}", beat.id, e);
                outcome.failed += 1;
            }
        }
    }
    debug!(
        "Sync pass pushed {} beats ({} failed)",
        outcome.pushed, outcome.failed
    );
    outcome
}
