// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Instant;

use jiff::Timestamp;

#[cfg(any(feature = "test-util", test))]
use crate::ClockControl;
use crate::Stopwatch;

/// Source of absolute and relative time.
///
/// Cloning a clock is cheap. Clones created from the same [`ClockControl`] observe the
/// same controlled time.
///
/// # Examples
///
/// ```
/// use bucketeer_clock::Clock;
///
/// let clock = Clock::new_system();
/// let later = clock.timestamp();
/// assert!(later.as_second() > 1_600_000_000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Clock(ClockRepr);

#[derive(Debug, Clone, Default)]
enum ClockRepr {
    #[default]
    System,
    #[cfg(any(feature = "test-util", test))]
    Controlled(ClockControl),
}

impl Clock {
    /// Creates a clock backed by the operating system.
    #[must_use]
    pub fn new_system() -> Self {
        Self(ClockRepr::System)
    }

    /// Creates a clock frozen at the UNIX epoch.
    ///
    /// Time never moves unless advanced through a [`ClockControl`], so prefer
    /// [`ClockControl::to_clock`] when the test needs to move time.
    #[cfg(any(feature = "test-util", test))]
    #[must_use]
    pub fn new_frozen() -> Self {
        ClockControl::new().to_clock()
    }

    /// Creates a clock frozen at `timestamp`.
    #[cfg(any(feature = "test-util", test))]
    #[must_use]
    pub fn new_frozen_at(timestamp: Timestamp) -> Self {
        ClockControl::new_at(timestamp).to_clock()
    }

    #[cfg(any(feature = "test-util", test))]
    pub(crate) fn with_control(control: &ClockControl) -> Self {
        Self(ClockRepr::Controlled(control.clone()))
    }

    /// Returns the current absolute time in UTC.
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        match &self.0 {
            ClockRepr::System => Timestamp::now(),
            #[cfg(any(feature = "test-util", test))]
            ClockRepr::Controlled(control) => control.timestamp(),
        }
    }

    /// Returns a monotonic instant suitable for measuring durations.
    #[must_use]
    pub fn instant(&self) -> Instant {
        match &self.0 {
            ClockRepr::System => Instant::now(),
            #[cfg(any(feature = "test-util", test))]
            ClockRepr::Controlled(control) => control.instant(),
        }
    }

    /// Starts a [`Stopwatch`] that measures time on this clock.
    #[must_use]
    pub fn stopwatch(&self) -> Stopwatch {
        Stopwatch::new(self)
    }
}
