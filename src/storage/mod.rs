// src/storage/mod.rs

//! Watermark persistence for the activity monitor.
//!
//! Each watched community keeps one watermark: the instant up to which
//! activity has already been delivered. Monitors read it on startup to
//! resume where they left off and advance it after successful cycles.
//! Stores are keyed by the community base URL, so language editions of the
//! same wiki track separately.

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Community;

pub use local::LocalWatermarkStore;

/// Delivery watermark of one community.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    /// Instant up to which events were delivered; `None` before first delivery
    #[serde(with = "optional_instant")]
    pub last: Option<DateTime<Utc>>,
}

/// Stored as an ISO 8601 string, with the empty string standing in for a
/// watermark that has not advanced yet.
mod optional_instant {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(instant) => {
                serializer.serialize_str(&instant.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<DateTime<Utc>>()
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

/// Trait for watermark storage backends.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Load the watermark of a community; empty if none is stored.
    async fn load(&self, community: &Community) -> Result<Watermark>;

    /// Persist the watermark of a community.
    async fn save(&self, community: &Community, watermark: &Watermark) -> Result<()>;

    /// Create an empty entry if the community has none, returning the
    /// current value either way.
    async fn ensure(&self, community: &Community) -> Result<Watermark>;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn watermark_serializes_as_iso_string() {
        let mark = Watermark {
            last: Some(Utc.timestamp_opt(1_714_564_800, 0).single().unwrap()),
        };
        let encoded = serde_json::to_string(&mark).unwrap();
        assert_eq!(encoded, r#"{"last":"2024-05-01T12:00:00Z"}"#);
        let decoded: Watermark = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, mark);
    }

    #[test]
    fn unset_watermark_serializes_as_empty_string() {
        let encoded = serde_json::to_string(&Watermark::default()).unwrap();
        assert_eq!(encoded, r#"{"last":""}"#);
        let decoded: Watermark = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.last, None);
    }

    #[test]
    fn garbage_instant_fails_to_decode() {
        assert!(serde_json::from_str::<Watermark>(r#"{"last":"not a date"}"#).is_err());
    }
}
