// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use bucketeer_cache_tier::{
    Command, Deleter, Error, Expirer, Getter, HyperLogLog, Incrementer, MultiGetter, Pipeline, Pipeliner, Putter, Result, Scanner,
    SetReader,
};
use bucketeer_clock::Clock;
use redis::aio::ConnectionManager;
use redis::{ErrorKind, RedisError};

use crate::builder::RedisBackendBuilder;
use crate::telemetry::{Code, RedisTelemetry};

/// A cache backend on one Redis instance.
///
/// Cloning is cheap; clones share the underlying multiplexed connection, which reconnects
/// on its own after failures.
///
/// Every call is bounded by the configured command deadline and fails with
/// [`Error::Timeout`] when it is missed. Dropping a call's future cancels it.
#[derive(Clone)]
pub struct RedisBackend {
    connection: ConnectionManager,
    command_timeout: Duration,
    telemetry: RedisTelemetry,
    clock: Clock,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("command_timeout", &self.command_timeout)
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Creates a builder for a backend connected to `url`.
    #[must_use]
    pub fn builder(url: impl Into<String>) -> RedisBackendBuilder {
        RedisBackendBuilder::new(url)
    }

    pub(crate) fn new(connection: ConnectionManager, command_timeout: Duration, telemetry: RedisTelemetry, clock: Clock) -> Self {
        Self {
            connection,
            command_timeout,
            telemetry,
            clock,
        }
    }

    /// Runs `request` under the command deadline and records its outcome.
    async fn run<T, F>(&self, command: &'static str, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let stopwatch = self.clock.stopwatch();
        let result = match tokio::time::timeout(self.command_timeout, request).await {
            Ok(result) => result,
            Err(_elapsed) => Err(Error::Timeout(self.command_timeout)),
        };
        self.telemetry.record(command, Code::of(&result), stopwatch.elapsed());
        result
    }

    async fn query<T: redis::FromRedisValue>(&self, command: &'static str, cmd: redis::Cmd) -> Result<T> {
        let mut connection = self.connection.clone();
        let timeout = self.command_timeout;
        self.run(command, async move {
            cmd.query_async(&mut connection).await.map_err(|error| map_error(error, timeout))
        })
        .await
    }

    async fn query_pipeline(&self, command: &'static str, pipe: redis::Pipeline) -> Result<()> {
        let mut connection = self.connection.clone();
        let timeout = self.command_timeout;
        self.run(command, async move {
            pipe.query_async::<()>(&mut connection)
                .await
                .map_err(|error| map_error(error, timeout))
        })
        .await
    }
}

/// Translates a client error into the cache taxonomy.
pub(crate) fn map_error(error: RedisError, timeout: Duration) -> Error {
    if error.kind() == ErrorKind::TypeError || error.code() == Some("WRONGTYPE") {
        return Error::InvalidType;
    }
    if error.detail().is_some_and(|detail| detail.contains("not an integer")) {
        return Error::InvalidType;
    }
    if error.is_timeout() {
        return Error::Timeout(timeout);
    }
    Error::backend(error)
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

pub(crate) fn set_command(key: &str, value: &[u8], ttl: Duration) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);
    if !ttl.is_zero() {
        cmd.arg("PX").arg(ttl_millis(ttl));
    }
    cmd
}

fn push_expire(pipe: &mut redis::Pipeline, key: &str, ttl: Duration) {
    if ttl.is_zero() {
        pipe.cmd("PERSIST").arg(key);
    } else {
        pipe.cmd("PEXPIRE").arg(key).arg(ttl_millis(ttl));
    }
}

pub(crate) fn to_redis_pipeline(pipeline: Pipeline) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    if pipeline.is_transactional() {
        pipe.atomic();
    }
    for command in pipeline.into_commands() {
        match command {
            Command::PfAdd { key, members } => {
                pipe.cmd("PFADD").arg(key).arg(members);
            }
            Command::SAdd { key, members } => {
                pipe.cmd("SADD").arg(key).arg(members);
            }
            Command::Expire { key, ttl } => push_expire(&mut pipe, &key, ttl),
        }
        pipe.ignore();
    }
    pipe
}

pub(crate) fn pf_merge_pipeline(dest: &str, keys: &[String], ttl: Duration) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic().cmd("PFMERGE").arg(dest).arg(keys).ignore();
    if !ttl.is_zero() {
        pipe.cmd("PEXPIRE").arg(dest).arg(ttl_millis(ttl)).ignore();
    }
    pipe
}

impl Getter for RedisBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let mut connection = self.connection.clone();
        let timeout = self.command_timeout;
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.run("GET", async move {
            let value: Option<Vec<u8>> = cmd.query_async(&mut connection).await.map_err(|error| map_error(error, timeout))?;
            value.ok_or(Error::NotFound)
        })
        .await
    }
}

impl Putter for RedisBackend {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.query::<()>("SET", set_command(key, &value, ttl)).await
    }
}

impl MultiGetter for RedisBackend {
    async fn get_multi(&self, keys: &[String], ignore_not_found: bool) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("MGET");
        cmd.arg(keys);
        let values: Vec<Option<Vec<u8>>> = self.query("MGET", cmd).await?;
        if !ignore_not_found && values.iter().any(Option::is_none) {
            return Err(Error::NotFound);
        }
        Ok(values)
    }
}

impl Scanner for RedisBackend {
    async fn scan(&self, cursor: u64, pattern: &str, count: u64) -> Result<(u64, Vec<String>)> {
        let mut cmd = redis::cmd("SCAN");
        cmd.arg(cursor).arg("MATCH").arg(pattern).arg("COUNT").arg(count);
        self.query("SCAN", cmd).await
    }
}

impl Deleter for RedisBackend {
    async fn delete(&self, key: &str) -> Result<()> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        self.query::<()>("DEL", cmd).await
    }
}

impl Incrementer for RedisBackend {
    async fn increment(&self, key: &str) -> Result<i64> {
        let mut cmd = redis::cmd("INCR");
        cmd.arg(key);
        self.query("INCR", cmd).await
    }
}

impl Expirer for RedisBackend {
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        if ttl.is_zero() {
            let mut pipe = redis::pipe();
            pipe.cmd("PERSIST").arg(key).ignore().cmd("EXISTS").arg(key);

            let mut connection = self.connection.clone();
            let timeout = self.command_timeout;
            let (exists,): (i64,) = self
                .run("PERSIST", async move {
                    pipe.query_async(&mut connection).await.map_err(|error| map_error(error, timeout))
                })
                .await?;
            return Ok(exists > 0);
        }

        let mut cmd = redis::cmd("PEXPIRE");
        cmd.arg(key).arg(ttl_millis(ttl));
        let changed: i64 = self.query("PEXPIRE", cmd).await?;
        Ok(changed > 0)
    }
}

impl Pipeliner for RedisBackend {
    async fn exec(&self, pipeline: Pipeline) -> Result<()> {
        if pipeline.is_empty() {
            return Ok(());
        }
        let command = if pipeline.is_transactional() { "MULTI" } else { "PIPELINE" };
        self.query_pipeline(command, to_redis_pipeline(pipeline)).await
    }
}

impl HyperLogLog for RedisBackend {
    async fn pf_count(&self, keys: &[String]) -> Result<i64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut cmd = redis::cmd("PFCOUNT");
        cmd.arg(keys);
        self.query("PFCOUNT", cmd).await
    }

    async fn pf_merge(&self, dest: &str, keys: &[String], ttl: Duration) -> Result<()> {
        self.query_pipeline("PFMERGE", pf_merge_pipeline(dest, keys, ttl)).await
    }
}

impl SetReader for RedisBackend {
    async fn s_members(&self, key: &str) -> Result<Vec<String>> {
        let mut cmd = redis::cmd("SMEMBERS");
        cmd.arg(key);
        self.query("SMEMBERS", cmd).await
    }
}
