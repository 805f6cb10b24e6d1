// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Capability traits implemented by cache backends.
//!
//! Each trait covers one family of commands so that typed wrappers can state exactly what
//! they need: the features cache only reads and writes single values, while the event
//! counter also needs increments, multi-gets and HyperLogLog commands.
//!
//! Every method returns a future. Dropping the future cancels the call; backends that talk
//! to the network also bound each call with their own deadline.

use std::time::Duration;

use crate::{Pipeline, Result};

/// A time-to-live of zero: the entry never expires.
pub const NO_EXPIRATION: Duration = Duration::ZERO;

/// Reads a single value.
pub trait Getter: Send + Sync {
    /// Returns the bytes stored at `key`.
    ///
    /// Fails with [`Error::NotFound`][crate::Error::NotFound] if the key is absent or
    /// expired, and with [`Error::InvalidType`][crate::Error::InvalidType] if the key holds
    /// something other than a plain value.
    fn get(&self, key: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Writes a single value.
pub trait Putter: Send + Sync {
    /// Stores `value` at `key`, replacing any previous value.
    ///
    /// A `ttl` of [`NO_EXPIRATION`] keeps the entry until it is overwritten or deleted.
    fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> impl Future<Output = Result<()>> + Send;
}

/// Reads many values in one round trip.
pub trait MultiGetter: Send + Sync {
    /// Returns the values for `keys`, position by position.
    ///
    /// With `ignore_not_found`, missing keys yield `None`; otherwise any missing key fails
    /// the whole batch with [`Error::NotFound`][crate::Error::NotFound]. A key holding a set or
    /// a sketch counts as missing, as it does for Redis `MGET`.
    fn get_multi(&self, keys: &[String], ignore_not_found: bool) -> impl Future<Output = Result<Vec<Option<Vec<u8>>>>> + Send;
}

/// Enumerates keys matching a pattern.
pub trait Scanner: Send + Sync {
    /// Returns the next cursor and a page of matching keys.
    ///
    /// Iteration starts with cursor `0` and is complete when the returned cursor is `0`
    /// again. `count` is a hint for the page size.
    fn scan(&self, cursor: u64, pattern: &str, count: u64) -> impl Future<Output = Result<(u64, Vec<String>)>> + Send;
}

/// Removes keys.
pub trait Deleter: Send + Sync {
    /// Removes `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Atomically increments integer counters.
pub trait Incrementer: Send + Sync {
    /// Increments the counter at `key` and returns the new value.
    ///
    /// A missing key starts at zero.
    fn increment(&self, key: &str) -> impl Future<Output = Result<i64>> + Send;
}

/// Updates expiry of existing keys.
pub trait Expirer: Send + Sync {
    /// Sets the time-to-live of `key`. Returns `false` if the key does not exist.
    fn expire(&self, key: &str, ttl: Duration) -> impl Future<Output = Result<bool>> + Send;
}

/// Executes batched commands.
pub trait Pipeliner: Send + Sync {
    /// Creates an empty command buffer for this backend.
    fn pipeline(&self, transactional: bool) -> Pipeline {
        Pipeline::new(transactional)
    }

    /// Runs every command of `pipeline` in submission order.
    fn exec(&self, pipeline: Pipeline) -> impl Future<Output = Result<()>> + Send;
}

/// Probabilistic distinct counting.
pub trait HyperLogLog: Send + Sync {
    /// Returns the approximate number of distinct members across `keys`.
    fn pf_count(&self, keys: &[String]) -> impl Future<Output = Result<i64>> + Send;

    /// Merges `keys` into `dest`, then applies `ttl` to `dest` in the same transaction.
    ///
    /// A `ttl` of [`NO_EXPIRATION`] leaves the expiry of `dest` untouched.
    fn pf_merge(&self, dest: &str, keys: &[String], ttl: Duration) -> impl Future<Output = Result<()>> + Send;
}

/// Reads set members.
pub trait SetReader: Send + Sync {
    /// Returns the members of the set at `key`, or an empty list if the key is missing.
    fn s_members(&self, key: &str) -> impl Future<Output = Result<Vec<String>>> + Send;
}
