//! Wire format for broadcast frames.
//!
//! A frame is one JSON array of sample records, oldest first:
//!
//! ```text
//! [{"Timestamp":"2024-01-01T00:00:00Z","Value":0.0}, ...]
//! ```
//!
//! Timestamps are RFC 3339 in UTC with up to nanosecond precision.

use crate::error::{EncodeError, Result};
use crate::sample::Sample;

/// Serializes a snapshot into one text frame.
///
/// # Errors
///
/// Returns [`EncodeError::Serialize`] if JSON serialization fails.
pub fn encode_snapshot(samples: &[Sample]) -> Result<String> {
    serde_json::to_string(samples).map_err(|source| EncodeError::Serialize { source }.into())
}

/// Parses a text frame back into samples.
///
/// # Errors
///
/// Returns [`EncodeError::Parse`] if the frame is not a valid sample array.
pub fn decode_snapshot(frame: &str) -> Result<Vec<Sample>> {
    serde_json::from_str(frame).map_err(|source| EncodeError::Parse { source }.into())
}
