// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jiff::Timestamp;
use parking_lot::Mutex;

use crate::Clock;

/// Controls the flow of time for clocks created from it.
///
/// Time starts at the UNIX epoch (or the timestamp given to [`ClockControl::new_at`]) and
/// moves only when [`advance`][Self::advance] is called.
///
/// Only enable the `test-util` feature for `dev-dependencies`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bucketeer_clock::ClockControl;
///
/// let control = ClockControl::new();
/// let clock = control.to_clock();
///
/// let stopwatch = clock.stopwatch();
/// control.advance(Duration::from_secs(3));
/// assert_eq!(stopwatch.elapsed(), Duration::from_secs(3));
/// ```
#[derive(Debug, Clone)]
pub struct ClockControl {
    state: Arc<Mutex<State>>,
}

#[derive(Debug)]
struct State {
    start: Timestamp,
    base_instant: Instant,
    elapsed: Duration,
}

impl Default for ClockControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockControl {
    /// Creates a control whose time starts at the UNIX epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::new_at(Timestamp::UNIX_EPOCH)
    }

    /// Creates a control whose time starts at `timestamp`.
    #[must_use]
    pub fn new_at(timestamp: Timestamp) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                start: timestamp,
                base_instant: Instant::now(),
                elapsed: Duration::ZERO,
            })),
        }
    }

    /// Creates a control whose time starts at the current system time.
    #[must_use]
    pub fn now() -> Self {
        Self::new_at(Timestamp::now())
    }

    /// Creates a [`Clock`] driven by this control.
    #[must_use]
    pub fn to_clock(&self) -> Clock {
        Clock::with_control(self)
    }

    /// Moves time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.elapsed = state.elapsed.saturating_add(duration);
    }

    /// Moves time forward by `millis` milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    pub(crate) fn timestamp(&self) -> Timestamp {
        let state = self.state.lock();
        state.start.checked_add(state.elapsed).unwrap_or(Timestamp::MAX)
    }

    pub(crate) fn instant(&self) -> Instant {
        let state = self.state.lock();
        state
            .base_instant
            .checked_add(state.elapsed)
            .unwrap_or(state.base_instant)
    }
}
