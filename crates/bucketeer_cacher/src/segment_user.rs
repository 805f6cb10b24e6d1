// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use bucketeer_cache::SegmentUsersCache;
use bucketeer_cache_tier::Putter;
use bucketeer_clock::Clock;
use bucketeer_proto::segment::{SegmentUser, SegmentUsers};

use crate::{CacherTelemetry, FanOut, Result, SegmentSource};

const NAME: &str = "segment_user";

/// Copies the users of every in-use segment into every cache instance.
///
/// Segments are listed first without their users, then fetched and written one at a
/// time, so only one segment's users are held in memory. A segment whose users cannot
/// be fetched is logged and skipped.
#[derive(Debug)]
pub struct SegmentUserCacher<S, C> {
    source: S,
    caches: FanOut<SegmentUsersCache<C>>,
    telemetry: CacherTelemetry,
    clock: Clock,
}

impl<S, C> SegmentUserCacher<S, C>
where
    S: SegmentSource,
    C: Putter,
{
    /// Creates a cacher that writes to each of `instances`.
    #[must_use]
    pub fn new(source: S, instances: Vec<C>, telemetry: CacherTelemetry, clock: Clock) -> Self {
        Self {
            source,
            caches: FanOut::new(instances.into_iter().map(SegmentUsersCache::new).collect(), NAME, telemetry.clone()),
            telemetry,
            clock,
        }
    }

    /// Refreshes every segment currently referenced by a flag.
    ///
    /// # Errors
    ///
    /// Fails when the in-use segments cannot be listed. Per-segment failures are logged
    /// and do not fail the refresh.
    pub async fn refresh_all_environment_caches(&self) -> Result<()> {
        let stopwatch = self.clock.stopwatch();
        let result = self.refresh_all().await;
        self.telemetry.record_cycle(NAME, result.is_ok(), stopwatch.elapsed());
        result
    }

    /// Refreshes one segment, stamping it with the current time.
    ///
    /// # Errors
    ///
    /// Fails when the segment's users cannot be listed.
    pub async fn refresh_segment_cache(&self, environment_id: &str, segment_id: &str) -> Result<()> {
        let stopwatch = self.clock.stopwatch();
        let result = self.refresh_segment(environment_id, segment_id).await;
        self.telemetry.record_cycle(NAME, result.is_ok(), stopwatch.elapsed());
        result
    }

    async fn refresh_segment(&self, environment_id: &str, segment_id: &str) -> Result<()> {
        let users = self
            .source
            .list_segment_users_by_segment(segment_id, environment_id)
            .await
            .inspect_err(|error| {
                tracing::error!(cacher = NAME, environment_id, segment_id, error = %error, "failed to list segment users");
            })?;

        self.put(environment_id, segment_id, users, self.clock.timestamp().as_second()).await;
        Ok(())
    }

    async fn refresh_all(&self) -> Result<()> {
        let segments = self
            .source
            .list_all_in_use_segments()
            .await
            .inspect_err(|error| tracing::error!(cacher = NAME, error = %error, "failed to list in-use segments"))?;

        let mut cached: BTreeMap<&str, usize> = BTreeMap::new();
        for segment in &segments {
            let users = match self
                .source
                .list_segment_users_by_segment(&segment.segment_id, &segment.environment_id)
                .await
            {
                Ok(users) => users,
                Err(error) => {
                    tracing::error!(
                        cacher = NAME,
                        environment_id = %segment.environment_id,
                        segment_id = %segment.segment_id,
                        error = %error,
                        "failed to list segment users"
                    );
                    continue;
                }
            };

            self.put(&segment.environment_id, &segment.segment_id, users, segment.updated_at).await;
            *cached.entry(segment.environment_id.as_str()).or_default() += 1;
        }

        for (environment_id, count) in &cached {
            self.telemetry.record_items(NAME, environment_id, *count);
        }

        tracing::debug!(cacher = NAME, segments = segments.len(), "refreshed segment user caches");
        Ok(())
    }

    async fn put(&self, environment_id: &str, segment_id: &str, users: Vec<SegmentUser>, updated_at: i64) -> usize {
        let snapshot = SegmentUsers {
            segment_id: segment_id.to_string(),
            users,
            updated_at,
        };
        self.caches.put(segment_id, |cache| cache.put(&snapshot, environment_id)).await
    }
}
