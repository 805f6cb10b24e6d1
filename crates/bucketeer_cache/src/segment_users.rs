// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashSet;

use bucketeer_cache_tier::{Getter, MultiGetter, NO_EXPIRATION, Putter, Result, Scanner, pattern};
use bucketeer_proto::segment::SegmentUsers;

use crate::EntityCache;
use crate::entity::decode;
use crate::key::{SEGMENT_USERS_KIND, make_key_prefix};

const SCAN_COUNT: u64 = 100;

/// Per-segment user snapshots, stored without expiry under `{env}:segment_users:{segment}`.
#[derive(Debug, Clone)]
pub struct SegmentUsersCache<C> {
    inner: EntityCache<C, SegmentUsers>,
}

impl<C> SegmentUsersCache<C> {
    /// Creates a cache over `backend`.
    pub fn new(backend: C) -> Self {
        Self {
            inner: EntityCache::new(backend, SEGMENT_USERS_KIND, NO_EXPIRATION),
        }
    }
}

impl<C: Getter> SegmentUsersCache<C> {
    /// Reads the users of `segment_id` in `environment_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`][bucketeer_cache_tier::Error::NotFound] if the segment is
    /// not cached, or any read or decode error.
    pub async fn get(&self, segment_id: &str, environment_id: &str) -> Result<SegmentUsers> {
        self.inner.get(segment_id, environment_id).await
    }
}

impl<C: Putter> SegmentUsersCache<C> {
    /// Replaces the snapshot of `users.segment_id` in `environment_id`.
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn put(&self, users: &SegmentUsers, environment_id: &str) -> Result<()> {
        self.inner.put(&users.segment_id, environment_id, users).await
    }
}

impl<C: Scanner + MultiGetter> SegmentUsersCache<C> {
    /// Reads every cached segment of `environment_id`.
    ///
    /// Keys are enumerated with a full scan of the environment's prefix before the values
    /// are fetched in one batch. Segments that disappear between the two steps are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first scan, read or decode error.
    pub async fn get_all(&self, environment_id: &str) -> Result<Vec<SegmentUsers>> {
        let keys = self.scan_keys(environment_id).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values = self.inner.backend().get_multi(&keys, true).await?;
        values.into_iter().flatten().map(|bytes| decode(&bytes)).collect()
    }

    async fn scan_keys(&self, environment_id: &str) -> Result<Vec<String>> {
        let pattern = format!("{}*", pattern::escape(&make_key_prefix(SEGMENT_USERS_KIND, environment_id)));
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut cursor = 0;
        loop {
            let (next, page) = self.inner.backend().scan(cursor, &pattern, SCAN_COUNT).await?;
            // A scan may report the same key more than once.
            keys.extend(page.into_iter().filter(|key| seen.insert(key.clone())));
            if next == 0 {
                break;
            }
            cursor = next;
        }
        tracing::trace!(environment_id, count = keys.len(), "scanned segment user keys");
        Ok(keys)
    }
}
