//! Beat record model and validation.
//!
//! A `BeatRecord` is the unit of synchronization: created in a browser
//! session at upload time, pushed to the gateway's metadata store, and
//! re-discovered by other sessions. All wire shapes are camelCase JSON
//! because the producers and consumers are browser sessions.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Historical cover-image field names, in fallback precedence order.
///
/// The canonical field is `coverImageUrl`; older upload flows wrote any of
/// these instead. Egress normalization checks the canonical field first,
/// then each alias in this order, and finally falls back to the empty
/// string. Link-preview image generation depends on this exact chain.
pub const COVER_IMAGE_ALIASES: [&str; 3] = ["coverImage", "imageUrl", "image"];

/// Where a beat record was learned from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeatSource {
    /// Produced by this browser session (found in its local store).
    Local,
    /// Learned from another session via the discovery endpoint.
    Community,
}

/// The canonical unit of synchronized beat metadata.
///
/// `id` and `title` default to empty on deserialize so that malformed
/// candidates survive parsing and are dropped by [`BeatRecord::validate`]
/// at the read boundary instead of failing the whole payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeatRecord {
    /// Stable unique identifier, producer-assigned.
    #[serde(default)]
    pub id: String,
    /// Display title; required for the record to be considered valid.
    #[serde(default)]
    pub title: String,
    /// Owning identity (wallet address or similar).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer_id: Option<String>,
    /// Canonical cover-image URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    // Legacy cover-image aliases; see COVER_IMAGE_ALIASES.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Absent means active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// Creation time, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// When this session learned of the record, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovered_at: Option<i64>,
    /// Legacy ingestion timestamp; used only as a sort fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<BeatSource>,
}

impl BeatRecord {
    /// Minimal constructor used by tests and the upload flow.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            producer_id: None,
            cover_image_url: None,
            cover_image: None,
            image_url: None,
            image: None,
            audio_url: None,
            genre: None,
            bpm: None,
            price: None,
            key: None,
            description: None,
            is_active: None,
            created_at: None,
            discovered_at: None,
            timestamp: None,
            source: None,
        }
    }

    /// A record is valid only if `id` and `title` are both non-empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && !self.title.is_empty()
    }

    /// Typed validity check; invalid candidates are dropped at read
    /// boundaries and counted in a [`ScanReport`].
    ///
    /// # Errors
    /// Returns the [`SkipReason`] describing the first missing field.
    pub fn validate(self) -> Result<Self, SkipReason> {
        if self.id.is_empty() {
            return Err(SkipReason::MissingId);
        }
        if self.title.is_empty() {
            return Err(SkipReason::MissingTitle);
        }
        Ok(self)
    }

    /// `isActive` absent is treated as active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active != Some(false)
    }

    /// Best available recency key: `createdAt`, else the legacy
    /// `timestamp`, else epoch zero (sorts last under descending order).
    #[must_use]
    pub fn sort_timestamp(&self) -> i64 {
        self.created_at.or(self.timestamp).unwrap_or(0)
    }

    /// Resolve the cover image through the alias fallback chain.
    #[must_use]
    pub fn resolved_cover_image(&self) -> &str {
        // Precedence order must match COVER_IMAGE_ALIASES exactly.
        self.cover_image_url
            .as_deref()
            .or(self.cover_image.as_deref())
            .or(self.image_url.as_deref())
            .or(self.image.as_deref())
            .unwrap_or("")
    }

    /// Collapse the cover-image alias fields into the canonical one.
    ///
    /// Applied once at the egress boundary so consumers only ever see
    /// `coverImageUrl` (possibly empty).
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let resolved = self.resolved_cover_image().to_string();
        self.cover_image_url = Some(resolved);
        self.cover_image = None;
        self.image_url = None;
        self.image = None;
        self
    }
}

/// Why a candidate record was dropped during a scan or listing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("record is missing an id")]
    MissingId,
    #[error("record is missing a title")]
    MissingTitle,
    #[error("stored value is not valid JSON: {0}")]
    Unparseable(String),
}

/// Aggregate counts of dropped candidates, for observability.
///
/// Scans return only the valid subset to callers; the report is logged
/// rather than surfaced to end users.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Candidates missing `id` or `title`.
    pub skipped_malformed: usize,
    /// Stored values that failed to deserialize.
    pub skipped_unparseable: usize,
}

impl ScanReport {
    /// Record a skipped candidate.
    pub fn note(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::MissingId | SkipReason::MissingTitle => self.skipped_malformed += 1,
            SkipReason::Unparseable(_) => self.skipped_unparseable += 1,
        }
    }

    #[must_use]
    pub const fn total_skipped(&self) -> usize {
        self.skipped_malformed + self.skipped_unparseable
    }
}

/// Current wall-clock time as epoch milliseconds.
///
/// Matches the `Date.now()` values browser sessions put on the wire.
#[must_use]
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(BeatRecord::new("1", "Kwaito Vibes").is_valid());
        assert!(!BeatRecord::new("", "Kwaito Vibes").is_valid());
        assert!(!BeatRecord::new("1", "").is_valid());

        assert_eq!(
            BeatRecord::new("", "t").validate().unwrap_err(),
            SkipReason::MissingId
        );
        assert_eq!(
            BeatRecord::new("1", "").validate().unwrap_err(),
            SkipReason::MissingTitle
        );
    }

    #[test]
    fn test_cover_image_fallback_chain() {
        let mut beat = BeatRecord::new("1", "t");
        assert_eq!(beat.resolved_cover_image(), "");

        beat.image = Some("d.png".into());
        assert_eq!(beat.resolved_cover_image(), "d.png");

        beat.image_url = Some("c.png".into());
        assert_eq!(beat.resolved_cover_image(), "c.png");

        beat.cover_image = Some("b.png".into());
        assert_eq!(beat.resolved_cover_image(), "b.png");

        beat.cover_image_url = Some("a.png".into());
        assert_eq!(beat.resolved_cover_image(), "a.png");
    }

    #[test]
    fn test_normalized_collapses_aliases() {
        let mut beat = BeatRecord::new("1", "t");
        beat.cover_image = Some("legacy.png".into());
        let norm = beat.normalized();
        assert_eq!(norm.cover_image_url.as_deref(), Some("legacy.png"));
        assert!(norm.cover_image.is_none());
        assert!(norm.image_url.is_none());
        assert!(norm.image.is_none());
    }

    #[test]
    fn test_sort_timestamp_fallbacks() {
        let mut beat = BeatRecord::new("1", "t");
        assert_eq!(beat.sort_timestamp(), 0);
        beat.timestamp = Some(5);
        assert_eq!(beat.sort_timestamp(), 5);
        beat.created_at = Some(9);
        assert_eq!(beat.sort_timestamp(), 9);
    }

    #[test]
    fn test_active_default() {
        let mut beat = BeatRecord::new("1", "t");
        assert!(beat.is_active());
        beat.is_active = Some(true);
        assert!(beat.is_active());
        beat.is_active = Some(false);
        assert!(!beat.is_active());
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let json = r#"{
            "id": "b1",
            "title": "Amapiano Groove",
            "producerId": "0xABC",
            "coverImage": "cover.png",
            "isActive": true,
            "createdAt": 1700000000000,
            "source": "community"
        }"#;
        let beat: BeatRecord = serde_json::from_str(json).unwrap();
        assert_eq!(beat.producer_id.as_deref(), Some("0xABC"));
        assert_eq!(beat.cover_image.as_deref(), Some("cover.png"));
        assert_eq!(beat.source, Some(BeatSource::Community));

        let out = serde_json::to_value(&beat).unwrap();
        assert_eq!(out["producerId"], "0xABC");
        assert_eq!(out["source"], "community");
        // Absent optionals stay off the wire entirely.
        assert!(out.get("audioUrl").is_none());
    }

    #[test]
    fn test_missing_id_still_parses() {
        let beat: BeatRecord = serde_json::from_str(r#"{"title":"orphan"}"#).unwrap();
        assert!(!beat.is_valid());
    }

    #[test]
    fn test_scan_report_counts() {
        let mut report = ScanReport::default();
        report.note(&SkipReason::MissingId);
        report.note(&SkipReason::MissingTitle);
        report.note(&SkipReason::Unparseable("bad".into()));
        assert_eq!(report.skipped_malformed, 2);
        assert_eq!(report.skipped_unparseable, 1);
        assert_eq!(report.total_skipped(), 3);
    }
}
