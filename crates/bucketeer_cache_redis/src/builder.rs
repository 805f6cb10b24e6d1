// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use bucketeer_cache_tier::{Error, Result};
use bucketeer_clock::Clock;
use opentelemetry::metrics::Meter;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};

use crate::backend::RedisBackend;
use crate::config::DEFAULT_COMMAND_TIMEOUT;
use crate::telemetry::RedisTelemetry;

/// Builder for connecting a [`RedisBackend`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use bucketeer_cache_redis::RedisBackend;
///
/// # async fn connect() -> bucketeer_cache_tier::Result<()> {
/// let backend = RedisBackend::builder("redis://cache-1.internal:6379")
///     .server_name("cache-1")
///     .command_timeout(Duration::from_secs(2))
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RedisBackendBuilder {
    pub(crate) url: String,
    pub(crate) server_name: Option<String>,
    pub(crate) command_timeout: Duration,
    pub(crate) connection_timeout: Option<Duration>,
    pub(crate) meter: Option<Meter>,
    pub(crate) clock: Option<Clock>,
}

impl RedisBackendBuilder {
    pub(crate) fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            server_name: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            connection_timeout: None,
            meter: None,
            clock: None,
        }
    }

    /// Sets the label recorded as `redis.server` in metrics. Defaults to the URL.
    #[must_use]
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// Sets the deadline for every command and pipeline.
    ///
    /// A call that misses it fails with [`Error::Timeout`].
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the deadline for each connection attempt.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout);
        self
    }

    /// Records per-command metrics on `meter`.
    #[must_use]
    pub fn meter(mut self, meter: &Meter) -> Self {
        self.meter = Some(meter.clone());
        self
    }

    /// Sets the clock used to time commands.
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Opens the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the URL is invalid or the server cannot be reached.
    #[cfg_attr(test, mutants::skip)] // Requires a live server.
    pub async fn connect(self) -> Result<RedisBackend> {
        let client = redis::Client::open(self.url.as_str()).map_err(Error::backend)?;

        let mut config = ConnectionManagerConfig::new().set_response_timeout(self.command_timeout);
        if let Some(timeout) = self.connection_timeout {
            config = config.set_connection_timeout(timeout);
        }

        let connection = ConnectionManager::new_with_config(client, config)
            .await
            .map_err(|error| Error::backend(error).context(format!("failed to connect to {}", self.url)))?;

        let server = self.server_name.unwrap_or(self.url);
        tracing::debug!(server = %server, "connected to redis");

        Ok(RedisBackend::new(
            connection,
            self.command_timeout,
            RedisTelemetry::new(server, self.meter.as_ref()),
            self.clock.unwrap_or_default(),
        ))
    }
}
