//! Time sources for tick-driven code
//!
//! Scheduled work never reads the wall clock directly. Hosts own a
//! [`TimeSource`] and hand it to everything they tick, so tests can drive
//! time by hand while the game uses a monotonic clock.

use std::sync::Arc;
use std::time::Instant;

use portable_atomic::{AtomicF64, Ordering};

/// Shared, thread-safe time source handle
pub type SharedClock = Arc<dyn TimeSource>;

/// Monotonic time in seconds since some fixed origin
pub trait TimeSource: Send + Sync {
    /// Current time in seconds
    fn now(&self) -> f64;
}

// ═══════════════════════════════════════════════════════════════════════════════
// MONOTONIC CLOCK
// ═══════════════════════════════════════════════════════════════════════════════

/// Wall clock backed by [`Instant`], origin at construction
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Wrap into a shared handle
    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    #[inline]
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MANUAL CLOCK
// ═══════════════════════════════════════════════════════════════════════════════

/// Clock that only moves when told to
///
/// Used by hosts that derive time from their own tick deltas and by tests.
#[derive(Debug)]
pub struct ManualClock {
    seconds: AtomicF64,
}

impl ManualClock {
    pub fn new(start_secs: f64) -> Self {
        Self {
            seconds: AtomicF64::new(start_secs),
        }
    }

    /// Move time forward by `delta_secs`, returns the new time
    pub fn advance(&self, delta_secs: f64) -> f64 {
        self.seconds.fetch_add(delta_secs, Ordering::AcqRel) + delta_secs
    }

    /// Jump to an absolute time
    pub fn set(&self, seconds: f64) {
        self.seconds.store(seconds, Ordering::Release);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl TimeSource for ManualClock {
    #[inline]
    fn now(&self) -> f64 {
        self.seconds.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(1.0);
        assert_relative_eq!(clock.now(), 1.0);

        let now = clock.advance(0.25);
        assert_relative_eq!(now, 1.25);
        assert_relative_eq!(clock.now(), 1.25);

        clock.set(10.0);
        assert_relative_eq!(clock.now(), 10.0);
    }

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert!(a >= 0.0);
    }

    #[test]
    fn test_shared_clock_is_object_safe() {
        let clock: SharedClock = Arc::new(ManualClock::new(2.0));
        assert_relative_eq!(clock.now(), 2.0);
    }
}
