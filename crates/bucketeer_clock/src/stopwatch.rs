// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, Instant};

use crate::Clock;

/// Measures elapsed time on a [`Clock`].
///
/// # Examples
///
/// ```
/// use bucketeer_clock::Clock;
///
/// let clock = Clock::new_system();
/// let stopwatch = clock.stopwatch();
/// // Perform some operation...
/// let _elapsed = stopwatch.elapsed();
/// ```
#[derive(Debug)]
pub struct Stopwatch {
    clock: Clock,
    start: Instant,
}

impl Stopwatch {
    /// Starts a stopwatch on `clock`.
    #[must_use]
    pub fn new(clock: &Clock) -> Self {
        Self {
            clock: clock.clone(),
            start: clock.instant(),
        }
    }

    /// Returns the time elapsed since the stopwatch was started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.clock.instant().saturating_duration_since(self.start)
    }
}

impl From<Stopwatch> for Duration {
    fn from(stopwatch: Stopwatch) -> Self {
        stopwatch.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClockControl;

    #[test]
    fn elapsed_follows_controlled_time() {
        let control = ClockControl::new();
        let stopwatch = control.to_clock().stopwatch();

        assert_eq!(stopwatch.elapsed(), Duration::ZERO);
        control.advance(Duration::from_millis(250));
        assert_eq!(Duration::from(stopwatch), Duration::from_millis(250));
    }
}
