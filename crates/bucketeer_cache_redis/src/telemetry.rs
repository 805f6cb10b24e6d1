// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-command metrics for the Redis backend.

use std::time::Duration;

use bucketeer_cache_tier::Error;
use opentelemetry::metrics::{Counter, Histogram, Meter, MeterProvider};
use opentelemetry::{InstrumentationScope, KeyValue};

const METER_NAME: &str = "bucketeer_cache_redis";
const VERSION: &str = "v0.1.0";
const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.47.0";

pub(crate) const COMMANDS_NAME: &str = "bucketeer.redis.commands";
pub(crate) const DURATION_NAME: &str = "bucketeer.redis.command.duration";

pub(crate) const SERVER: &str = "redis.server";
pub(crate) const COMMAND: &str = "redis.command";
pub(crate) const CODE: &str = "redis.code";

/// Creates the meter used by [`RedisBackend`][crate::RedisBackend] instruments.
#[must_use]
pub fn create_meter(meter_provider: &dyn MeterProvider) -> Meter {
    meter_provider.meter_with_scope(
        InstrumentationScope::builder(METER_NAME)
            .with_version(VERSION)
            .with_schema_url(SCHEMA_URL)
            .build(),
    )
}

fn create_command_counter(meter: &Meter) -> Counter<u64> {
    meter
        .u64_counter(COMMANDS_NAME)
        .with_description("Redis commands executed")
        .with_unit("{command}")
        .build()
}

fn create_duration_histogram(meter: &Meter) -> Histogram<f64> {
    meter
        .f64_histogram(DURATION_NAME)
        .with_description("Redis command duration")
        .with_unit("s")
        .build()
}

/// Outcome of a single command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Code {
    Success,
    NotFound,
    InvalidType,
    Timeout,
    Fail,
}

impl Code {
    pub(crate) fn of<T>(result: &Result<T, Error>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(error) if error.is_not_found() => Self::NotFound,
            Err(error) if error.is_invalid_type() => Self::InvalidType,
            Err(error) if matches!(error.root(), Error::Timeout(_)) => Self::Timeout,
            Err(_) => Self::Fail,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::InvalidType => "invalid_type",
            Self::Timeout => "timeout",
            Self::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RedisTelemetry {
    server: String,
    commands: Option<Counter<u64>>,
    duration: Option<Histogram<f64>>,
}

impl RedisTelemetry {
    pub(crate) fn new(server: impl Into<String>, meter: Option<&Meter>) -> Self {
        Self {
            server: server.into(),
            commands: meter.map(create_command_counter),
            duration: meter.map(create_duration_histogram),
        }
    }

    pub(crate) fn record(&self, command: &'static str, code: Code, elapsed: Duration) {
        let attrs = [
            KeyValue::new(SERVER, self.server.clone()),
            KeyValue::new(COMMAND, command),
            KeyValue::new(CODE, code.as_str()),
        ];

        if let Some(counter) = &self.commands {
            counter.add(1, &attrs);
        }
        if let Some(histogram) = &self.duration {
            histogram.record(elapsed.as_secs_f64(), &attrs[..2]);
        }
    }
}
