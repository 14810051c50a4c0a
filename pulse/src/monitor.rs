//! Process-wide owner of the live series.
//!
//! [`Monitor`] ties the pieces together: it builds the [`SeriesBuffer`],
//! spawns the [`Sampler`], spawns one [`BroadcastSession`] per attached
//! transport, and on [`shutdown`](Monitor::shutdown) stops and joins all of
//! them. Dropping a `Monitor` without calling `shutdown` also stops every
//! task, since they all watch the same shutdown channel.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::buffer::SeriesBuffer;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::sampler::{Sampler, UniformSource, ValueSource};
use crate::session::{BroadcastSession, SessionId, SessionReport, Transport};

/// Handle to a running sampler and its observer sessions.
pub struct Monitor {
    config: MonitorConfig,
    buffer: Arc<SeriesBuffer>,
    shutdown: watch::Sender<bool>,
    sampler: JoinHandle<()>,
    sessions: Mutex<JoinSet<SessionReport>>,
    next_session: AtomicU64,
    active: Arc<AtomicUsize>,
}

impl Monitor {
    /// Starts a monitor sampling uniform random values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](crate::error::ConfigError) if `config` is invalid.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(config: MonitorConfig) -> Result<Self> {
        Self::start_with_source(config, UniformSource::new())
    }

    /// Starts a monitor sampling from `source`.
    ///
    /// The buffer is pre-filled relative to the current wall-clock time
    /// before the sampler task is spawned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](crate::error::ConfigError) if `config` is invalid.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start_with_source<S: ValueSource>(config: MonitorConfig, source: S) -> Result<Self> {
        config.validate()?;

        let buffer = Arc::new(SeriesBuffer::new(
            config.capacity,
            Utc::now(),
            config.sampling_period,
        )?);

        let (shutdown, signal) = watch::channel(false);
        let sampler = tokio::spawn(
            Sampler::new(Arc::clone(&buffer), config.sampling_period, source).run(signal),
        );

        info!(
            capacity = config.capacity,
            sampling = ?config.sampling_period,
            broadcast = ?config.broadcast_period,
            "monitor started"
        );

        Ok(Self {
            config,
            buffer,
            shutdown,
            sampler,
            sessions: Mutex::new(JoinSet::new()),
            next_session: AtomicU64::new(1),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Spawns a broadcast session over `transport` and returns its id.
    ///
    /// Sessions that have already finished are reaped here, so the set of
    /// tracked tasks stays proportional to the live observer count.
    pub fn attach<T: Transport>(&self, transport: T) -> SessionId {
        let id = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
        let session = BroadcastSession::new(
            id,
            Arc::clone(&self.buffer),
            transport,
            self.config.broadcast_period,
        );
        let signal = self.shutdown.subscribe();
        let active = ActiveSession::enter(&self.active);

        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(done) = sessions.try_join_next() {
            match done {
                Ok(report) => debug!(session = %report.id, frames = report.frames_sent, "session reaped"),
                Err(e) => warn!(error = %e, "session task failed"),
            }
        }

        sessions.spawn(async move {
            let _active = active;
            session.run_with_shutdown(signal).await
        });

        id
    }

    /// Number of sessions currently broadcasting.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// The shared series.
    pub fn buffer(&self) -> &Arc<SeriesBuffer> {
        &self.buffer
    }

    /// The configuration this monitor was started with.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Stops the sampler and every session, then waits for all of them.
    ///
    /// Returns the reports of sessions that had not yet been reaped by
    /// [`attach`](Self::attach), which includes every session still live
    /// when shutdown began.
    pub async fn shutdown(self) -> Vec<SessionReport> {
        let _ = self.shutdown.send(true);

        if let Err(e) = self.sampler.await {
            warn!(error = %e, "sampler task failed");
        }

        let mut sessions = self
            .sessions
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let mut reports = Vec::with_capacity(sessions.len());
        while let Some(done) = sessions.join_next().await {
            match done {
                Ok(report) => reports.push(report),
                Err(e) => warn!(error = %e, "session task failed"),
            }
        }

        info!(sessions = reports.len(), "monitor stopped");
        reports
    }
}

/// Counts one live session; the count drops when the task ends, panics included.
struct ActiveSession(Arc<AtomicUsize>);

impl ActiveSession {
    fn enter(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self(Arc::clone(count))
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("config", &self.config)
            .field("pushes", &self.buffer.pushes())
            .field("active_sessions", &self.active_sessions())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::session::{ChannelTransport, TerminationReason};
    use std::time::Duration;

    /// Never completes a send.
    struct StalledTransport;

    impl Transport for StalledTransport {
        async fn send(&mut self, _frame: String) -> std::result::Result<(), TransportError> {
            std::future::pending().await
        }
    }

    /// Panics on the first send.
    struct PanickingTransport;

    impl Transport for PanickingTransport {
        async fn send(&mut self, _frame: String) -> std::result::Result<(), TransportError> {
            panic!("transport bug");
        }
    }

    fn config() -> MonitorConfig {
        MonitorConfig::new(50, Duration::from_millis(10), Duration::from_millis(200)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_runs_after_start() {
        let monitor = Monitor::start_with_source(config(), || 0.5_f32).unwrap();

        tokio::time::sleep(Duration::from_millis(105)).await;
        assert_eq!(monitor.buffer().pushes(), 10);
        assert_eq!(monitor.buffer().latest().value, 0.5);
        assert_eq!(monitor.buffer().len(), 50);

        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let bad = MonitorConfig {
            capacity: 0,
            ..MonitorConfig::default()
        };
        assert!(Monitor::start(bad).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_assigns_distinct_ids() {
        let monitor = Monitor::start(config()).unwrap();
        let (a, _rx_a) = ChannelTransport::pair(4);
        let (b, _rx_b) = ChannelTransport::pair(4);

        let id_a = monitor.attach(a);
        let id_b = monitor.attach(b);
        assert_ne!(id_a, id_b);
        assert_eq!(monitor.active_sessions(), 2);

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_joins_sessions() {
        let monitor = Monitor::start(config()).unwrap();
        let (transport, mut rx) = ChannelTransport::pair(16);
        let id = monitor.attach(transport);

        let frame = rx.recv().await.unwrap();
        assert_eq!(crate::wire::decode_snapshot(&frame).unwrap().len(), 50);

        let reports = monitor.shutdown().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, id);
        assert!(matches!(reports[0].reason, TerminationReason::Shutdown));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_session_leaves_active_count() {
        let monitor = Monitor::start(config()).unwrap();
        let (transport, rx) = ChannelTransport::pair(4);
        drop(rx);
        monitor.attach(transport);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(monitor.active_sessions(), 0);

        let reports = monitor.shutdown().await;
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0].reason, TerminationReason::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_completes_with_stalled_observer() {
        let monitor = Monitor::start(config()).unwrap();
        let (transport, mut rx) = ChannelTransport::pair(16);
        monitor.attach(transport);
        monitor.attach(StalledTransport);

        rx.recv().await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(monitor.active_sessions(), 2);

        let reports = tokio::time::timeout(Duration::from_secs(30), monitor.shutdown())
            .await
            .expect("shutdown hung on a stalled observer");
        assert_eq!(reports.len(), 2);
        assert!(
            reports
                .iter()
                .all(|r| matches!(r.reason, TerminationReason::Shutdown))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_session_releases_active_count() {
        let monitor = Monitor::start(config()).unwrap();
        let (transport, _rx) = ChannelTransport::pair(16);
        monitor.attach(transport);
        monitor.attach(PanickingTransport);
        assert_eq!(monitor.active_sessions(), 2);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(monitor.active_sessions(), 1);

        // The panicked task is logged and skipped; the healthy one reports.
        let reports = monitor.shutdown().await;
        assert_eq!(reports.len(), 1);
    }
}
