// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! File-loadable connection settings.

use std::time::Duration;

use serde::Deserialize;

use crate::RedisBackendBuilder;

/// Command deadline applied when none is configured.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

fn default_command_timeout_ms() -> u64 {
    u64::try_from(DEFAULT_COMMAND_TIMEOUT.as_millis()).unwrap_or(u64::MAX)
}

/// Connection settings for one Redis instance.
///
/// Durations are given in milliseconds so the struct maps directly onto JSON or YAML
/// configuration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bucketeer_cache_redis::RedisConfig;
///
/// let config: RedisConfig = serde_json::from_str(r#"{ "url": "redis://localhost:6379" }"#).unwrap();
/// assert_eq!(config.command_timeout(), Duration::from_secs(5));
/// assert_eq!(config.server_name(), "redis://localhost:6379");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://host:6379/0`.
    pub url: String,
    /// Label used in metrics. Defaults to the URL.
    #[serde(default)]
    pub server_name: Option<String>,
    /// Deadline for every command and pipeline.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Deadline for establishing a connection.
    #[serde(default)]
    pub connection_timeout_ms: Option<u64>,
}

impl RedisConfig {
    /// Creates settings for `url` with default deadlines.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            server_name: None,
            command_timeout_ms: default_command_timeout_ms(),
            connection_timeout_ms: None,
        }
    }

    /// Returns the metrics label of this instance.
    #[must_use]
    pub fn server_name(&self) -> &str {
        self.server_name.as_deref().unwrap_or(&self.url)
    }

    /// Returns the per-command deadline.
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Returns the connection deadline, if one is set.
    #[must_use]
    pub fn connection_timeout(&self) -> Option<Duration> {
        self.connection_timeout_ms.map(Duration::from_millis)
    }

    /// Turns these settings into a backend builder.
    #[must_use]
    pub fn to_builder(&self) -> RedisBackendBuilder {
        let mut builder = RedisBackendBuilder::new(self.url.clone())
            .server_name(self.server_name())
            .command_timeout(self.command_timeout());
        if let Some(timeout) = self.connection_timeout() {
            builder = builder.connection_timeout(timeout);
        }
        builder
    }
}
