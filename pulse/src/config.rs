//! Monitor configuration.
//!
//! A [`MonitorConfig`] fixes the three numbers that shape the live series:
//! how many samples it holds, how often a sample is taken, and how often
//! each observer receives a snapshot. All three are set once at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default number of samples kept in the series.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Default interval between two samples.
pub const DEFAULT_SAMPLING_PERIOD: Duration = Duration::from_millis(10);

/// Default interval between two broadcasts to one observer.
pub const DEFAULT_BROADCAST_PERIOD: Duration = Duration::from_millis(200);

/// Sizing and cadence of a live series.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use pulse::config::MonitorConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = MonitorConfig::new(
///     1_000,
///     Duration::from_millis(10),
///     Duration::from_millis(250),
/// )?;
/// assert_eq!(config.capacity, 1_000);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Number of samples held by the series buffer.
    pub capacity: usize,

    /// Interval at which the sampler pushes a new sample.
    pub sampling_period: Duration,

    /// Interval at which every session sends a snapshot.
    ///
    /// Coarser than `sampling_period` so each frame carries many new samples.
    pub broadcast_period: Duration,
}

impl MonitorConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the capacity is zero, either period is
    /// zero, or the broadcast period is shorter than the sampling period.
    pub fn new(
        capacity: usize,
        sampling_period: Duration,
        broadcast_period: Duration,
    ) -> Result<Self> {
        let config = Self {
            capacity,
            sampling_period,
            broadcast_period,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity.into());
        }

        if self.sampling_period.is_zero() {
            return Err(ConfigError::ZeroPeriod {
                name: "sampling period",
            }
            .into());
        }

        if self.broadcast_period.is_zero() {
            return Err(ConfigError::ZeroPeriod {
                name: "broadcast period",
            }
            .into());
        }

        if self.broadcast_period < self.sampling_period {
            return Err(ConfigError::BroadcastFasterThanSampling {
                broadcast: self.broadcast_period,
                sampling: self.sampling_period,
            }
            .into());
        }

        Ok(())
    }

    /// Time span covered by a full buffer.
    pub fn window(&self) -> Duration {
        self.sampling_period
            .saturating_mul(u32::try_from(self.capacity).unwrap_or(u32::MAX))
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            sampling_period: DEFAULT_SAMPLING_PERIOD,
            broadcast_period: DEFAULT_BROADCAST_PERIOD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PulseError;

    #[test]
    fn test_default_is_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capacity, 10_000);
        assert_eq!(config.window(), Duration::from_secs(100));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = MonitorConfig::new(0, DEFAULT_SAMPLING_PERIOD, DEFAULT_BROADCAST_PERIOD)
            .unwrap_err();
        assert!(matches!(err, PulseError::Config(ConfigError::ZeroCapacity)));
    }

    #[test]
    fn test_zero_periods_rejected() {
        let err = MonitorConfig::new(10, Duration::ZERO, DEFAULT_BROADCAST_PERIOD).unwrap_err();
        assert!(matches!(
            err,
            PulseError::Config(ConfigError::ZeroPeriod { name: "sampling period" })
        ));

        let err = MonitorConfig::new(10, DEFAULT_SAMPLING_PERIOD, Duration::ZERO).unwrap_err();
        assert!(matches!(
            err,
            PulseError::Config(ConfigError::ZeroPeriod { name: "broadcast period" })
        ));
    }

    #[test]
    fn test_broadcast_faster_than_sampling_rejected() {
        let err = MonitorConfig::new(10, Duration::from_millis(100), Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(
            err,
            PulseError::Config(ConfigError::BroadcastFasterThanSampling { .. })
        ));

        // Equal periods are allowed.
        assert!(
            MonitorConfig::new(10, Duration::from_millis(50), Duration::from_millis(50)).is_ok()
        );
    }
}
