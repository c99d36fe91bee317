use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use quanta::Clock;
use quanta::Instant;

/// Whole-second wall clock used to identify request windows.
///
/// The Unix epoch offset is sampled once; after that, time advances with a monotonic
/// `quanta` clock. Injecting `Clock::mock()` makes window rollover fully deterministic.
#[derive(Clone, Debug)]
pub struct WallClock {
    clock: Clock,
    anchor: Instant,
    epoch: Duration,
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock {
    pub fn new() -> Self {
        Self::with_clock(Clock::new())
    }

    pub fn with_clock(clock: Clock) -> Self {
        let anchor = clock.now();
        // A clock set before 1970 is treated as the epoch itself.
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            clock,
            anchor,
            epoch,
        }
    }

    /// The current epoch second.
    #[inline]
    pub fn unix_secs(&self) -> u64 {
        let elapsed = self.clock.now().duration_since(self.anchor);
        (self.epoch + elapsed).as_secs()
    }
}
