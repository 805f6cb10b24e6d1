// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory backends.

use std::time::Duration;

use bucketeer_clock::Clock;

use crate::backend::InMemoryBackend;

/// Builder for configuring an [`InMemoryBackend`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bucketeer_cache_memory::InMemoryBackend;
///
/// let backend = InMemoryBackend::builder()
///     .initial_capacity(128)
///     .eviction_interval(Duration::from_secs(60))
///     .build();
/// # backend.destroy();
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackendBuilder {
    pub(crate) eviction_interval: Option<Duration>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) clock: Option<Clock>,
}

impl InMemoryBackendBuilder {
    /// Creates a builder with default settings.
    ///
    /// The default backend never runs the background evicter; expired entries are only
    /// hidden on read until they are overwritten.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how often the background evicter sweeps expired entries.
    ///
    /// The evicter runs on the Tokio runtime that is current when [`build`][Self::build] is
    /// called. A zero interval disables it.
    #[must_use]
    pub fn eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = Some(interval);
        self
    }

    /// Sets the pre-allocation hint for the entry map.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Sets the clock used to stamp and check expiration times.
    ///
    /// Defaults to the system clock.
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the configured backend.
    #[must_use]
    pub fn build(self) -> InMemoryBackend {
        InMemoryBackend::from_builder(self)
    }
}
