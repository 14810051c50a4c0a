//! The single producer feeding the series buffer.
//!
//! A [`Sampler`] wakes once per sampling period, asks its [`ValueSource`]
//! for a reading and pushes it into the shared [`SeriesBuffer`]. It never
//! talks to readers; the buffer is the only rendezvous point.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, trace};

use crate::buffer::SeriesBuffer;
use crate::sample::Sample;

/// Produces the scalar for each new sample.
///
/// Implementations hold no state shared with readers; the only mutable
/// state they may own is their own random source or counter.
pub trait ValueSource: Send + 'static {
    /// Returns the next reading.
    fn next_value(&mut self) -> f32;
}

/// Uniformly distributed readings in `[0, 1)`.
#[derive(Debug)]
pub struct UniformSource {
    rng: StdRng,
}

impl UniformSource {
    /// Creates a source seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a deterministic source.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueSource for UniformSource {
    fn next_value(&mut self) -> f32 {
        self.rng.r#gen::<f32>()
    }
}

impl<F> ValueSource for F
where
    F: FnMut() -> f32 + Send + 'static,
{
    fn next_value(&mut self) -> f32 {
        self()
    }
}

/// Periodic writer for a [`SeriesBuffer`].
pub struct Sampler<S = UniformSource> {
    buffer: Arc<SeriesBuffer>,
    period: Duration,
    source: S,
}

impl<S: ValueSource> Sampler<S> {
    /// Creates a sampler that pushes into `buffer` every `period`.
    pub fn new(buffer: Arc<SeriesBuffer>, period: Duration, source: S) -> Self {
        Self {
            buffer,
            period,
            source,
        }
    }

    /// Takes one reading stamped `timestamp` and pushes it.
    pub fn tick(&mut self, timestamp: DateTime<Utc>) -> Sample {
        let sample = Sample::new(timestamp, self.source.next_value());
        self.buffer.push(sample);
        trace!(value = sample.value, "sample pushed");
        sample
    }

    /// Samples until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// The first sample is taken one period after the call. A tick that
    /// fires late is skipped rather than bursted.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval_at(time::Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            period = ?self.period,
            capacity = self.buffer.capacity(),
            "sampler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Utc::now());
                }
                _ = shutdown.wait_for(|stop| *stop) => break,
            }
        }

        info!(pushes = self.buffer.pushes(), "sampler stopped");
    }
}
