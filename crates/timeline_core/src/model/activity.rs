//! Activity record model.
//!
//! # Responsibility
//! - Define the captured, time-boxed activity shared by every timeline view.
//! - Derive the display domain from a captured URL.
//!
//! # Invariants
//! - `duration_seconds` is authoritative and never recomputed from
//!   `end - start` (capture clocks may skew).
//! - `duration_seconds` is never negative and `end` is never before `start`.
//! - Records are never deleted by the engine; only flags and links change.

use super::validation::ValidationError;
use chrono::{DateTime, TimeDelta, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one captured activity.
pub type ActivityId = Uuid;
/// Stable identifier of one activity group.
pub type GroupId = Uuid;
/// Identifier of the onboarding client an activity or group is billed to.
pub type ClientId = Uuid;

static URL_HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-zA-Z][a-zA-Z0-9+.\-]*://)?(?:[^@/?#]*@)?([^/:?#]+)")
        .expect("valid url host regex")
});

/// Captured activity as exchanged with the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: ActivityId,
    pub url: String,
    pub domain: String,
    pub title: String,
    /// Serialized as `startTime` (ISO-8601).
    #[serde(rename = "startTime")]
    pub start: DateTime<Utc>,
    /// Serialized as `endTime` (ISO-8601). Informational only.
    #[serde(rename = "endTime")]
    pub end: DateTime<Utc>,
    pub duration_seconds: i64,
    #[serde(default)]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub hidden: bool,
    /// Capture channel tag, e.g. `extension` or `manual`.
    pub source: String,
}

impl ActivityRecord {
    /// Creates an ungrouped, visible activity with a generated ID.
    ///
    /// `end` is derived from `start + duration_seconds`; `domain` is derived
    /// from `url`.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        duration_seconds: i64,
        source: impl Into<String>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), url, title, start, duration_seconds, source)
    }

    /// Creates an activity with a caller-provided ID.
    ///
    /// Used by ingest paths where the capture collaborator already assigned
    /// identity.
    pub fn with_id(
        id: ActivityId,
        url: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        duration_seconds: i64,
        source: impl Into<String>,
    ) -> Self {
        let url = url.into();
        let end = TimeDelta::try_seconds(duration_seconds)
            .and_then(|delta| start.checked_add_signed(delta))
            .unwrap_or(start);
        Self {
            id,
            domain: domain_from_url(&url),
            url,
            title: title.into(),
            start,
            end,
            duration_seconds,
            client_id: None,
            group_id: None,
            hidden: false,
            source: source.into(),
        }
    }

    /// Validates capture invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.duration_seconds < 0 {
            return Err(ValidationError::NegativeDuration {
                activity_id: self.id,
                duration_seconds: self.duration_seconds,
            });
        }
        if self.end < self.start {
            return Err(ValidationError::EndBeforeStart(self.id));
        }
        Ok(())
    }
}

/// Extracts the lowercase host part of a URL, or returns an empty string
/// when no host can be found.
pub fn domain_from_url(url: &str) -> String {
    URL_HOST_RE
        .captures(url.trim())
        .and_then(|captures| captures.get(1))
        .map(|host| host.as_str().to_ascii_lowercase())
        .unwrap_or_default()
}
