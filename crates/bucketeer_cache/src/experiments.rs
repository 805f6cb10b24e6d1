// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bucketeer_cache_tier::{Getter, NO_EXPIRATION, Putter, Result};
use bucketeer_proto::experiment::Experiments;

use crate::EntityCache;
use crate::key::EXPERIMENTS_KIND;

/// Per-environment experiment snapshots, stored without expiry under `{env}:experiments`.
#[derive(Debug, Clone)]
pub struct ExperimentsCache<C> {
    inner: EntityCache<C, Experiments>,
}

impl<C> ExperimentsCache<C> {
    /// Creates a cache over `backend`.
    pub fn new(backend: C) -> Self {
        Self {
            inner: EntityCache::new(backend, EXPERIMENTS_KIND, NO_EXPIRATION),
        }
    }
}

impl<C: Getter> ExperimentsCache<C> {
    /// Reads the snapshot of `environment_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`][bucketeer_cache_tier::Error::NotFound] if nothing is
    /// cached, or any read or decode error.
    pub async fn get(&self, environment_id: &str) -> Result<Experiments> {
        self.inner.get("", environment_id).await
    }
}

impl<C: Putter> ExperimentsCache<C> {
    /// Replaces the snapshot of `environment_id`.
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn put(&self, experiments: &Experiments, environment_id: &str) -> Result<()> {
        self.inner.put("", environment_id, experiments).await
    }
}
