//! A single timestamped reading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reading of the monitored quantity.
///
/// Samples are plain `Copy` values; once created they are never mutated.
/// On the wire they serialize as `{"Timestamp": "<RFC 3339>", "Value": <f32>}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the reading was taken.
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,

    /// The reading itself.
    #[serde(rename = "Value")]
    pub value: f32,
}

impl Sample {
    /// Creates a sample.
    pub fn new(timestamp: DateTime<Utc>, value: f32) -> Self {
        Self { timestamp, value }
    }

    /// A zero-valued sample used to pre-fill a fresh buffer.
    pub fn placeholder(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, 0.0)
    }
}
