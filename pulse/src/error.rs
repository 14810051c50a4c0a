//! Error types for the pulse live series.

use std::time::Duration;

use thiserror::Error;

/// The main error type for all pulse operations.
///
/// Buffer reads and writes never fail once the buffer exists, so the
/// variants here cover construction, encoding and the transport edge.
#[derive(Error, Debug)]
pub enum PulseError {
    /// The monitor or buffer configuration was rejected.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A snapshot could not be encoded or decoded.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// An observer transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors raised while validating a [`MonitorConfig`](crate::config::MonitorConfig)
/// or constructing a [`SeriesBuffer`](crate::buffer::SeriesBuffer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The buffer capacity must be at least one sample.
    #[error("buffer capacity must be > 0")]
    ZeroCapacity,

    /// A timer period was zero.
    #[error("{name} must be non-zero")]
    ZeroPeriod {
        /// Which period was zero.
        name: &'static str,
    },

    /// Broadcasting faster than sampling would resend identical frames.
    #[error("broadcast period {broadcast:?} is shorter than sampling period {sampling:?}")]
    BroadcastFasterThanSampling {
        /// The configured broadcast period.
        broadcast: Duration,
        /// The configured sampling period.
        sampling: Duration,
    },
}

/// Errors that can occur while serializing snapshots for the wire.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// Failed to serialize a snapshot to JSON.
    #[error("failed to serialize snapshot: {source}")]
    Serialize {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to parse a frame back into samples.
    #[error("failed to parse snapshot frame: {source}")]
    Parse {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors a [`Transport`](crate::session::Transport) may report.
///
/// Every variant is terminal for the session that observed it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The peer is gone.
    #[error("transport closed")]
    Closed,

    /// The write itself failed.
    #[error("send failed: {reason}")]
    Send {
        /// Description reported by the underlying connection.
        reason: String,
    },
}

/// Type alias for `Result<T, PulseError>`.
pub type Result<T> = std::result::Result<T, PulseError>;
