// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bucketeer_cache_tier::{Getter, NO_EXPIRATION, Putter, Result};
use bucketeer_proto::feature::Features;

use crate::EntityCache;
use crate::key::FEATURES_KIND;

/// Per-environment feature flag snapshots, stored without expiry under `{env}:features`.
#[derive(Debug, Clone)]
pub struct FeaturesCache<C> {
    inner: EntityCache<C, Features>,
}

impl<C> FeaturesCache<C> {
    /// Creates a cache over `backend`.
    pub fn new(backend: C) -> Self {
        Self {
            inner: EntityCache::new(backend, FEATURES_KIND, NO_EXPIRATION),
        }
    }

    /// Returns the key of the snapshot of `environment_id`.
    #[must_use]
    pub fn key(&self, environment_id: &str) -> String {
        self.inner.key("", environment_id)
    }
}

impl<C: Getter> FeaturesCache<C> {
    /// Reads the snapshot of `environment_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`][bucketeer_cache_tier::Error::NotFound] if the
    /// environment has not been cached, or any read or decode error.
    pub async fn get(&self, environment_id: &str) -> Result<Features> {
        self.inner.get("", environment_id).await
    }
}

impl<C: Putter> FeaturesCache<C> {
    /// Replaces the snapshot of `environment_id`.
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn put(&self, features: &Features, environment_id: &str) -> Result<()> {
        self.inner.put("", environment_id, features).await
    }
}
