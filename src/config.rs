use crate::error::CreationError;
use crate::invariants;

/// Channel topology, fixed at creation time (spec.md §1, §9 "Dynamic dispatch
/// by mode"). Each variant carries the state that is only meaningful for
/// that topology, so there is no way to construct a config in a
/// contradictory state (e.g. `Spsc` with a `max_producers`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Single producer, single consumer: one shared tail.
    Spsc,
    /// Multiple producers (up to `max_producers`), single consumer: one
    /// tail per producer plus the generation-cached min-tail scan.
    Mpsc {
        /// Upper bound on concurrently registered producers.
        max_producers: usize,
    },
    /// Single producer, multiple consumers racing on the head via CAS.
    Spmc,
}

impl Mode {
    /// Returns `Some(max_producers)` for `Mpsc`, `None` otherwise.
    #[inline]
    pub const fn max_producers(&self) -> Option<usize> {
        match self {
            Mode::Mpsc { max_producers } => Some(*max_producers),
            Mode::Spsc | Mode::Spmc => None,
        }
    }
}

/// Configuration for a [`crate::Channel`].
///
/// `capacity` is always a power of two: [`Config::new`] rounds a requested
/// capacity up and rejects a request for 0 (spec.md §4.1).
#[derive(Debug, Clone, Copy)]
pub struct Config {
    capacity: usize,
    mode: Mode,
    enable_metrics: bool,
}

impl Config {
    /// Creates a configuration, rounding `requested_capacity` up to the next
    /// power of two.
    ///
    /// # Errors
    ///
    /// - [`CreationError::InvalidCapacity`] if `requested_capacity` is 0 or
    ///   the rounded capacity would overflow `usize`.
    /// - [`CreationError::MpscRequiresMaxProducers`] if `mode` is
    ///   `Mpsc { max_producers: 0 }`.
    pub fn new(
        requested_capacity: usize,
        mode: Mode,
        enable_metrics: bool,
    ) -> Result<Self, CreationError> {
        if requested_capacity == 0 {
            return Err(CreationError::InvalidCapacity { requested: 0 });
        }
        let capacity = requested_capacity
            .checked_next_power_of_two()
            .ok_or(CreationError::InvalidCapacity {
                requested: requested_capacity,
            })?;
        if let Mode::Mpsc { max_producers: 0 } = mode {
            return Err(CreationError::MpscRequiresMaxProducers);
        }
        invariants::debug_assert_power_of_two!(capacity);
        Ok(Self {
            capacity,
            mode,
            enable_metrics,
        })
    }

    /// Returns the rounded, power-of-two ring capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the index mask for wrapping (`capacity - 1`).
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity - 1
    }

    /// Returns the channel's topology.
    #[inline]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns whether metrics collection is enabled.
    #[inline]
    pub const fn metrics_enabled(&self) -> bool {
        self.enable_metrics
    }
}

impl Default for Config {
    /// SPSC, 64K slots, metrics disabled.
    fn default() -> Self {
        Self {
            capacity: 1 << 16,
            mode: Mode::Spsc,
            enable_metrics: false,
        }
    }
}

/// Low-latency preset: 4K slots (fits in L1 on most desktop cores), MPSC
/// with up to 16 producers.
pub fn low_latency_mpsc() -> Config {
    Config::new(1 << 12, Mode::Mpsc { max_producers: 16 }, false)
        .expect("preset capacity and producer count are always valid")
}

/// High-throughput preset: 256K slots, MPSC with up to 32 producers.
pub fn high_throughput_mpsc() -> Config {
    Config::new(1 << 18, Mode::Mpsc { max_producers: 32 }, false)
        .expect("preset capacity and producer count are always valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_capacity_up_to_power_of_two() {
        let config = Config::new(5, Mode::Spsc, false).unwrap();
        assert_eq!(config.capacity(), 8);
        assert_eq!(config.mask(), 7);
    }

    #[test]
    fn rejects_zero_capacity() {
        assert!(matches!(
            Config::new(0, Mode::Spsc, false),
            Err(CreationError::InvalidCapacity { requested: 0 })
        ));
    }

    #[test]
    fn rejects_mpsc_without_max_producers() {
        assert!(matches!(
            Config::new(16, Mode::Mpsc { max_producers: 0 }, false),
            Err(CreationError::MpscRequiresMaxProducers)
        ));
    }

    #[test]
    fn power_of_two_capacity_is_unchanged() {
        let config = Config::new(64, Mode::Spmc, false).unwrap();
        assert_eq!(config.capacity(), 64);
    }
}
