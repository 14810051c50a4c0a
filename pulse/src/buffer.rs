//! Fixed-capacity series buffer shared by one writer and many readers.
//!
//! The buffer is a ring of `capacity` samples guarded by a single mutex.
//! It is pre-filled at construction, so its length is `capacity` from the
//! first moment any other task can see it, and every [`push`] evicts exactly
//! one sample to make room for exactly one new one.
//!
//! # Design
//!
//! - `head` is the slot of the oldest sample; the newest sits just before it
//! - `push` overwrites `slots[head]` and advances `head` (O(1), no allocation)
//! - `snapshot` copies the requested tail out under the lock, as at most two
//!   contiguous slices
//! - Order is insertion order; timestamps are never compared
//!
//! Both operations hold the lock for their whole duration, so a reader sees
//! the ring either entirely before or entirely after any given push.
//!
//! [`push`]: SeriesBuffer::push

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::warn;

use crate::error::{ConfigError, Result};
use crate::sample::Sample;

/// A bounded, time-ordered series of samples.
///
/// Share it behind an `Arc`; all methods take `&self`.
///
/// # Thread Safety
///
/// Designed for a single writer calling [`push`](Self::push) and any number
/// of concurrent readers calling [`snapshot`](Self::snapshot). Readers never
/// observe a length other than `capacity` or a half-applied push.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use chrono::Utc;
/// use pulse::buffer::SeriesBuffer;
/// use pulse::sample::Sample;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let now = Utc::now();
/// let buffer = SeriesBuffer::new(4, now, Duration::from_millis(10))?;
///
/// buffer.push(Sample::new(now, 0.5));
///
/// let recent = buffer.snapshot(4);
/// assert_eq!(recent.len(), 4);
/// assert_eq!(recent[3].value, 0.5);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SeriesBuffer {
    ring: Mutex<Ring>,
    capacity: usize,
    sampling_period: Duration,
}

/// Lock-protected ring state.
#[derive(Debug)]
struct Ring {
    /// Always exactly `capacity` long.
    slots: Vec<Sample>,
    /// Slot holding the oldest sample.
    head: usize,
    /// Number of pushes since construction.
    pushes: u64,
}

impl Ring {
    fn push(&mut self, sample: Sample) {
        self.slots[self.head] = sample;
        self.head = (self.head + 1) % self.slots.len();
        self.pushes += 1;
    }

    /// Appends the `n` newest samples to `out`, oldest first. `n <= len`.
    fn copy_recent(&self, n: usize, out: &mut Vec<Sample>) {
        if n == 0 {
            return;
        }

        let len = self.slots.len();
        let start = (self.head + len - n) % len;

        if start + n <= len {
            out.extend_from_slice(&self.slots[start..start + n]);
        } else {
            out.extend_from_slice(&self.slots[start..]);
            out.extend_from_slice(&self.slots[..n - (len - start)]);
        }
    }

    fn newest(&self) -> Sample {
        let len = self.slots.len();
        self.slots[(self.head + len - 1) % len]
    }
}

impl SeriesBuffer {
    /// Creates a buffer pre-filled with `capacity` zero-valued samples.
    ///
    /// Placeholder `i` (0 = oldest) is stamped
    /// `initial_timestamp - (capacity - 1 - i) * sampling_period`, so the
    /// newest placeholder carries `initial_timestamp` itself. Timestamps that
    /// would fall before the representable range are clamped to it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroCapacity`] if `capacity` is zero.
    pub fn new(
        capacity: usize,
        initial_timestamp: DateTime<Utc>,
        sampling_period: Duration,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity.into());
        }

        let slots = (0..capacity)
            .rev()
            .map(|steps_back| {
                Sample::placeholder(offset_back(initial_timestamp, sampling_period, steps_back))
            })
            .collect();

        Ok(Self {
            ring: Mutex::new(Ring {
                slots,
                head: 0,
                pushes: 0,
            }),
            capacity,
            sampling_period,
        })
    }

    /// Evicts the oldest sample and appends `sample` as the newest.
    pub fn push(&self, sample: Sample) {
        self.ring().push(sample);
    }

    /// Returns a copy of the `n` most recent samples, oldest first.
    ///
    /// Requests larger than the capacity are clamped to `capacity` entries;
    /// the buffer never pads with synthetic samples. `snapshot(0)` is empty.
    pub fn snapshot(&self, n: usize) -> Vec<Sample> {
        let mut out = Vec::with_capacity(n.min(self.capacity));
        self.snapshot_into(n, &mut out);
        out
    }

    /// Like [`snapshot`](Self::snapshot), but reuses `out`'s allocation.
    ///
    /// `out` is cleared first.
    pub fn snapshot_into(&self, n: usize, out: &mut Vec<Sample>) {
        out.clear();
        let n = self.clamp(n);
        out.reserve(n);
        self.ring().copy_recent(n, out);
    }

    /// Returns the newest sample.
    pub fn latest(&self) -> Sample {
        self.ring().newest()
    }

    /// Returns the fixed number of samples held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of samples held, which is always the capacity.
    pub fn len(&self) -> usize {
        self.ring().slots.len()
    }

    /// Always `false`: a buffer is full from construction on.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the sampling period the placeholders were spaced by.
    pub fn sampling_period(&self) -> Duration {
        self.sampling_period
    }

    /// Returns the number of pushes since construction.
    pub fn pushes(&self) -> u64 {
        self.ring().pushes
    }

    fn clamp(&self, n: usize) -> usize {
        if n > self.capacity {
            warn!(
                requested = n,
                capacity = self.capacity,
                "snapshot larger than buffer capacity, clamping"
            );
            self.capacity
        } else {
            n
        }
    }

    /// Every critical section leaves the ring consistent, so a poisoned lock
    /// still guards valid data.
    fn ring(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `origin - steps * period`, saturating at the earliest representable instant.
fn offset_back(origin: DateTime<Utc>, period: Duration, steps: usize) -> DateTime<Utc> {
    let steps = u32::try_from(steps).unwrap_or(u32::MAX);
    TimeDelta::from_std(period.saturating_mul(steps))
        .ok()
        .and_then(|delta| origin.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
