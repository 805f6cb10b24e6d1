// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use bucketeer_cache_tier::{HyperLogLog, Pipeliner, Result};
use jiff::civil::Date;
use jiff::tz::TimeZone;
use jiff::{Timestamp, ToSpan};

use crate::key::make_key;

/// Lifetime of daily active user estimates: long enough to merge any past month.
pub const DAU_TTL: Duration = Duration::from_secs(60 * 24 * 60 * 60);

/// Daily and monthly active user estimates per environment and SDK source.
///
/// Every day has its own HyperLogLog at `{env}:{source}:dau:{yyyyMMdd}`, in UTC. Monthly
/// figures are the union of a month's daily estimates, either counted on the fly or merged
/// into `{env}:{source}:mau:{yyyyMM}`.
///
/// # Examples
///
/// ```
/// use bucketeer_cache::MauCache;
/// use bucketeer_cache_memory::InMemoryBackend;
/// use jiff::Timestamp;
///
/// # futures::executor::block_on(async {
/// let cache = MauCache::new(InMemoryBackend::new());
/// let at: Timestamp = "2026-01-28T15:30:00Z".parse().unwrap();
///
/// cache.record_dau("env-123", "ANDROID", "user-456", at).await?;
/// cache.record_dau("env-123", "ANDROID", "user-456", at).await?;
///
/// assert_eq!(cache.dau_count("env-123", "ANDROID", at.to_zoned(jiff::tz::TimeZone::UTC).date()).await?, 1);
/// # Ok::<(), bucketeer_cache_tier::Error>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MauCache<C> {
    backend: C,
}

impl<C> MauCache<C> {
    /// Creates a cache over `backend`.
    pub fn new(backend: C) -> Self {
        Self { backend }
    }
}

/// Returns the DAU key of `source` in `environment_id` for `date`.
#[must_use]
pub fn dau_key(environment_id: &str, source: &str, date: Date) -> String {
    make_key(&format!("{source}:dau"), &date.strftime("%Y%m%d").to_string(), environment_id)
}

/// Returns the merged MAU key of `source` in `environment_id` for the month of `month`.
#[must_use]
pub fn mau_key(environment_id: &str, source: &str, month: Date) -> String {
    make_key(&format!("{source}:mau"), &month.strftime("%Y%m").to_string(), environment_id)
}

fn month_dau_keys(environment_id: &str, source: &str, month: Date) -> Vec<String> {
    let days = usize::try_from(month.days_in_month()).unwrap_or_default();
    month
        .first_of_month()
        .series(1.day())
        .take(days)
        .map(|date| dau_key(environment_id, source, date))
        .collect()
}

impl<C: Pipeliner> MauCache<C> {
    /// Records that `user_id` was active at `at`.
    ///
    /// Adds the user to the day's estimate and resets its expiry to [`DAU_TTL`] in one
    /// transactional pipeline. An empty `user_id` is ignored.
    ///
    /// # Errors
    ///
    /// Returns the backend error prefixed with `failed to record DAU`.
    pub async fn record_dau(&self, environment_id: &str, source: &str, user_id: &str, at: Timestamp) -> Result<()> {
        if user_id.is_empty() {
            return Ok(());
        }

        let key = dau_key(environment_id, source, at.to_zoned(TimeZone::UTC).date());
        let mut pipeline = self.backend.pipeline(true);
        pipeline.pf_add(key.as_str(), [user_id]).expire(key, DAU_TTL);
        self.backend
            .exec(pipeline)
            .await
            .map_err(|error| error.context("failed to record DAU"))
    }
}

impl<C: HyperLogLog> MauCache<C> {
    /// Returns the estimated number of users active on `date`.
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn dau_count(&self, environment_id: &str, source: &str, date: Date) -> Result<i64> {
        self.backend.pf_count(&[dau_key(environment_id, source, date)]).await
    }

    /// Returns the estimated number of users active in the month of `month`.
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn mau_count(&self, environment_id: &str, source: &str, month: Date) -> Result<i64> {
        self.backend
            .pf_count(&month_dau_keys(environment_id, source, month))
            .await
    }

    /// Merges the daily estimates of the month of `month` into its MAU key, which then
    /// expires after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn merge_mau(&self, environment_id: &str, source: &str, month: Date, ttl: Duration) -> Result<()> {
        let dest = mau_key(environment_id, source, month);
        self.backend
            .pf_merge(&dest, &month_dau_keys(environment_id, source, month), ttl)
            .await
    }
}
