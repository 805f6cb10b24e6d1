// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bucketeer_cache_tier::{Deleter, Error, HyperLogLog, Incrementer, MultiGetter, Pipeliner, Result};

use crate::key::{AUTO_OPS_GOAL_KIND, make_key};

/// Event counters and unique-user estimates used by event-rate auto-ops rules.
///
/// Event counts are plain integer counters. User counts are HyperLogLog estimates that
/// only ever grow until their key is deleted.
#[derive(Debug, Clone)]
pub struct EventCounterCache<C> {
    backend: C,
}

impl<C> EventCounterCache<C> {
    /// Creates a cache over `backend`.
    pub fn new(backend: C) -> Self {
        Self { backend }
    }
}

impl<C: MultiGetter> EventCounterCache<C> {
    /// Reads the counters at `keys`, position by position. Missing counters read as zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidType`] if a key holds something other than an integer, or
    /// any backend error.
    pub async fn get_event_counts(&self, keys: &[String]) -> Result<Vec<i64>> {
        let values = self.backend.get_multi(keys, true).await?;
        values
            .into_iter()
            .map(|value| value.map_or(Ok(0), |bytes| parse_count(&bytes)))
            .collect()
    }
}

impl<C: Incrementer> EventCounterCache<C> {
    /// Adds one to the counter at `key` and returns the new count.
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn increment_event_count(&self, key: &str) -> Result<i64> {
        self.backend.increment(key).await
    }
}

impl<C: Pipeliner> EventCounterCache<C> {
    /// Adds `user_id` to the unique-user estimate at `key`.
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn update_user_count(&self, key: &str, user_id: &str) -> Result<()> {
        let mut pipeline = self.backend.pipeline(false);
        pipeline.pf_add(key, [user_id]);
        self.backend.exec(pipeline).await
    }
}

impl<C: HyperLogLog> EventCounterCache<C> {
    /// Returns the unique-user estimate at `key`.
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn get_user_count(&self, key: &str) -> Result<i64> {
        self.backend.pf_count(&[key.to_string()]).await
    }

    /// Returns the unique-user estimate of each of `keys`, position by position.
    ///
    /// # Errors
    ///
    /// Returns the first backend error.
    pub async fn get_user_counts(&self, keys: &[String]) -> Result<Vec<i64>> {
        let mut counts = Vec::with_capacity(keys.len());
        for key in keys {
            counts.push(self.backend.pf_count(std::slice::from_ref(key)).await?);
        }
        Ok(counts)
    }
}

impl<C: Deleter> EventCounterCache<C> {
    /// Removes the counter or estimate at `key`.
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.backend.delete(key).await
    }
}

/// Builds the key counting users who reached a goal through one flag variation.
///
/// ```
/// use bucketeer_cache::user_count_key;
///
/// let key = user_count_key("env", "checkout", 3, "rule", "clause", "on");
/// assert_eq!(key, "env:autoops:goal:checkout:3:rule:clause:on");
/// ```
#[must_use]
pub fn user_count_key(
    environment_id: &str,
    feature_id: &str,
    feature_version: i32,
    rule_id: &str,
    clause_id: &str,
    variation_id: &str,
) -> String {
    let id = format!("{feature_id}:{feature_version}:{rule_id}:{clause_id}:{variation_id}");
    make_key(AUTO_OPS_GOAL_KIND, &id, environment_id)
}

fn parse_count(bytes: &[u8]) -> Result<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or(Error::InvalidType)
}
