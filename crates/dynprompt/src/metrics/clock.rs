//! Time sources for the metrics sampler.
//!
//! A [`ClockReading`] pairs a wall-clock timestamp (what gets printed in the
//! artifact) with a monotonic instant (what the elapsed counter is derived
//! from). Both halves come from a single call to [`Clock::now`], so the
//! sampler never combines readings taken at different moments.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// One reading of a [`Clock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    /// Wall-clock time, used for the human-readable timestamp.
    pub wall: DateTime<Utc>,
    /// Monotonic time, used for elapsed-time arithmetic.
    pub monotonic: Instant,
}

/// Source of [`ClockReading`]s.
pub trait Clock: Send + Sync {
    fn now(&self) -> ClockReading;
}

/// The real clock: `Utc::now()` paired with `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> ClockReading {
        ClockReading {
            wall: Utc::now(),
            monotonic: Instant::now(),
        }
    }
}

/// A clock that only moves when told to.
///
/// Starts at a fixed wall time and advances both halves of the reading by
/// the same amount on [`advance`](Self::advance). Useful for deterministic
/// tests of anything driven by a [`MetricsSampler`](super::MetricsSampler).
#[derive(Debug)]
pub struct ManualClock {
    base_wall: DateTime<Utc>,
    base_instant: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock frozen at `wall`.
    pub fn new(wall: DateTime<Utc>) -> Self {
        Self {
            base_wall: wall,
            base_instant: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }

    /// The wall time the clock started at.
    pub fn base_wall(&self) -> DateTime<Utc> {
        self.base_wall
    }
}

impl Clock for ManualClock {
    fn now(&self) -> ClockReading {
        // Single offset read: both halves must agree.
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        let wall = chrono::Duration::from_std(offset)
            .ok()
            .and_then(|d| self.base_wall.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        ClockReading {
            wall,
            monotonic: self.base_instant + offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_starts_at_base() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::new(base);
        assert_eq!(clock.now().wall, base);
        assert_eq!(clock.base_wall(), base);
    }

    #[test]
    fn manual_clock_advances_both_halves() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::new(base);
        let before = clock.now();

        clock.advance(Duration::from_secs(90));
        let after = clock.now();

        assert_eq!((after.wall - before.wall).num_seconds(), 90);
        assert_eq!(after.monotonic - before.monotonic, Duration::from_secs(90));
    }

    #[test]
    fn system_clock_moves_forward() {
        let a = SystemClock.now();
        let b = SystemClock.now();
        assert!(b.monotonic >= a.monotonic);
    }
}
