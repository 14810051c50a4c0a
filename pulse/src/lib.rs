//! # pulse
//!
//! A bounded, continuously updated time series with push-based snapshots.
//!
//! One sampler task appends a reading every sampling period and evicts the
//! oldest, so the series always holds exactly `capacity` samples. Any number
//! of broadcast sessions, each on its own slower timer, copy the whole series
//! and send it to their observer as a single frame.
//!
//! ## Key Properties
//!
//! - Fixed-size ring, pre-filled at construction: length never changes
//! - One writer, many readers, one mutex; readers never see a torn ring
//! - Sessions are isolated: a failing observer only ends its own session
//! - No persistence, no backpressure; a slow observer is simply dropped
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pulse::{ChannelTransport, Monitor, MonitorConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let monitor = Monitor::start(MonitorConfig::default())?;
//!
//! let (transport, mut frames) = ChannelTransport::pair(8);
//! monitor.attach(transport);
//!
//! if let Some(frame) = frames.recv().await {
//!     let samples = pulse::wire::decode_snapshot(&frame)?;
//!     println!("{} samples, newest {:?}", samples.len(), samples.last());
//! }
//!
//! monitor.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`SeriesBuffer`]: The shared ring; `push` and `snapshot`
//! - [`Sampler`]: The single periodic writer
//! - [`BroadcastSession`]: One periodic reader per observer
//! - [`Monitor`]: Owns all of the above for the life of the process
//!
//! ## Modules
//!
//! - [`buffer`]: Series buffer
//! - [`sample`]: Sample value type
//! - [`sampler`]: Producer task and value sources
//! - [`session`]: Broadcast sessions and the transport seam
//! - [`monitor`]: Lifecycle and shutdown
//! - [`wire`]: Frame encoding
//! - [`config`]: Sizing and cadence
//! - [`error`]: Error types

pub mod buffer;
pub mod config;
pub mod error;
pub mod monitor;
pub mod sample;
pub mod sampler;
pub mod session;
pub mod wire;

// Re-export primary API types at crate root for convenience.
pub use buffer::SeriesBuffer;
pub use config::MonitorConfig;
pub use error::{ConfigError, PulseError, Result, TransportError};
pub use monitor::Monitor;
pub use sample::Sample;
pub use sampler::{Sampler, UniformSource, ValueSource};
pub use session::{
    BroadcastSession, ChannelTransport, SessionId, SessionReport, SessionState, TerminationReason,
    Transport,
};
