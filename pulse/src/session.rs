//! Per-observer broadcast sessions.
//!
//! A [`BroadcastSession`] owns one outbound [`Transport`] and its own timer.
//! Every broadcast period it copies the whole series out of the shared
//! [`SeriesBuffer`], encodes it as one frame and sends it. The first failed
//! send ends the session; nothing is retried and no other session or the
//! sampler ever hears about it.
//!
//! # State machine
//!
//! ```text
//! Active --(send fails | shutdown)--> Terminated
//! ```
//!
//! Terminated is absorbing: the timer stops and the transport is dropped
//! with the session.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::buffer::SeriesBuffer;
use crate::error::{PulseError, Result, TransportError};
use crate::sample::Sample;
use crate::wire::encode_snapshot;

/// Outbound half of an observer connection.
///
/// The session only ever writes; any error is treated as the end of the
/// connection.
pub trait Transport: Send + 'static {
    /// Sends one encoded frame.
    fn send(
        &mut self,
        frame: String,
    ) -> impl Future<Output = std::result::Result<(), TransportError>> + Send;
}

/// In-process transport backed by a bounded channel.
///
/// A full channel makes `send` wait; a dropped receiver closes the transport.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<String>,
}

impl ChannelTransport {
    /// Creates a transport and the receiver its frames arrive on.
    ///
    /// # Panics
    ///
    /// Panics if `depth` is zero.
    pub fn pair(depth: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(depth);
        (Self { tx }, rx)
    }
}

impl Transport for ChannelTransport {
    async fn send(&mut self, frame: String) -> std::result::Result<(), TransportError> {
        self.tx.send(frame).await.map_err(|_| TransportError::Closed)
    }
}

/// Identifier of one observer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Broadcasting on every tick.
    Active,
    /// Stopped for good.
    Terminated,
}

/// Why a session stopped.
#[derive(Debug)]
pub enum TerminationReason {
    /// A frame could not be encoded or sent.
    Failed(PulseError),
    /// The process asked the session to stop.
    Shutdown,
}

/// Summary returned when a session ends.
#[derive(Debug)]
pub struct SessionReport {
    /// The session that ended.
    pub id: SessionId,
    /// Frames delivered before the end.
    pub frames_sent: u64,
    /// What ended it.
    pub reason: TerminationReason,
}

/// Periodically sends full snapshots of a [`SeriesBuffer`] over a [`Transport`].
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use chrono::Utc;
/// use pulse::buffer::SeriesBuffer;
/// use pulse::session::{BroadcastSession, ChannelTransport, SessionId};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let buffer = Arc::new(SeriesBuffer::new(100, Utc::now(), Duration::from_millis(10))?);
/// let (transport, mut frames) = ChannelTransport::pair(4);
///
/// let session = BroadcastSession::new(SessionId(1), buffer, transport, Duration::from_millis(200));
/// tokio::spawn(session.run());
///
/// while let Some(frame) = frames.recv().await {
///     println!("{} bytes", frame.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct BroadcastSession<T> {
    id: SessionId,
    buffer: Arc<SeriesBuffer>,
    transport: T,
    period: Duration,
    state: SessionState,
    frames_sent: u64,
    /// Reused snapshot storage.
    scratch: Vec<Sample>,
}

impl<T: Transport> BroadcastSession<T> {
    /// Creates an active session. Nothing is sent until [`run`](Self::run).
    pub fn new(id: SessionId, buffer: Arc<SeriesBuffer>, transport: T, period: Duration) -> Self {
        let scratch = Vec::with_capacity(buffer.capacity());
        Self {
            id,
            buffer,
            transport,
            period,
            state: SessionState::Active,
            frames_sent: 0,
            scratch,
        }
    }

    /// Returns the session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Broadcasts until the transport fails.
    pub async fn run(self) -> SessionReport {
        self.drive(None).await
    }

    /// Broadcasts until the transport fails or `shutdown` flips to `true`.
    ///
    /// Dropping the sender also stops the session.
    pub async fn run_with_shutdown(self, shutdown: watch::Receiver<bool>) -> SessionReport {
        self.drive(Some(shutdown)).await
    }

    /// Copies, encodes and sends one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Transport`] if the send fails and
    /// [`PulseError::Encode`] if the snapshot cannot be serialized. Either
    /// moves the session to [`SessionState::Terminated`].
    pub async fn broadcast(&mut self) -> Result<()> {
        if self.state == SessionState::Terminated {
            return Err(TransportError::Closed.into());
        }

        self.buffer
            .snapshot_into(self.buffer.capacity(), &mut self.scratch);

        let sent = match encode_snapshot(&self.scratch) {
            Ok(frame) => self.transport.send(frame).await.map_err(PulseError::from),
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => {
                self.frames_sent += 1;
                debug!(session = %self.id, frames = self.frames_sent, "frame sent");
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Terminated;
                Err(e)
            }
        }
    }

    async fn drive(mut self, mut shutdown: Option<watch::Receiver<bool>>) -> SessionReport {
        let mut interval = time::interval_at(time::Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(session = %self.id, period = ?self.period, "session started");

        let reason = loop {
            tokio::select! {
                _ = interval.tick() => {}
                () = shutdown_requested(&mut shutdown) => break TerminationReason::Shutdown,
            }

            // A peer that stops reading can park the send indefinitely.
            tokio::select! {
                sent = self.broadcast() => {
                    if let Err(e) = sent {
                        warn!(session = %self.id, error = %e, "broadcast failed, closing session");
                        break TerminationReason::Failed(e);
                    }
                }
                () = shutdown_requested(&mut shutdown) => {
                    debug!(session = %self.id, "shutdown while a frame was in flight");
                    break TerminationReason::Shutdown;
                }
            }
        };

        self.state = SessionState::Terminated;
        info!(session = %self.id, frames = self.frames_sent, "session ended");

        SessionReport {
            id: self.id,
            frames_sent: self.frames_sent,
            reason,
        }
    }
}

/// Resolves once shutdown is requested; never resolves without a signal.
async fn shutdown_requested(shutdown: &mut Option<watch::Receiver<bool>>) {
    match shutdown {
        Some(rx) => {
            let _ = rx.wait_for(|stop| *stop).await;
        }
        None => std::future::pending().await,
    }
}
