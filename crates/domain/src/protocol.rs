use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Server timestamps are seconds; we keep millisecond resolution.
const TIMESTAMP_MULTIPLIER: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("comment {id} carries an invalid `{field}` timestamp: {value}")]
    InvalidTimestamp {
        id: u64,
        field: &'static str,
        value: f64,
    },
}

/// Converts fractional seconds since the epoch, truncating below the millisecond.
pub fn timestamp(id: u64, field: &'static str, secs: f64) -> Result<DateTime<Utc>, RecordError> {
    let invalid = || RecordError::InvalidTimestamp {
        id,
        field,
        value: secs,
    };

    let millis = (secs * TIMESTAMP_MULTIPLIER).trunc();
    if !millis.is_finite() || millis < i64::MIN as f64 || millis > i64::MAX as f64 {
        return Err(invalid());
    }
    Utc.timestamp_millis_opt(millis as i64)
        .single()
        .ok_or_else(invalid)
}

/// Body of create and update requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPayload {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// `null` for top level comments.
    pub parent: Option<u64>,
}
