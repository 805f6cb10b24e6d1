// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use bucketeer_cache_tier::{Getter, Putter, Result};
use bucketeer_proto::autoops::AutoOpsRules;

use crate::EntityCache;
use crate::key::AUTO_OPS_RULES_KIND;

/// Lifetime of cached auto-ops rules.
///
/// Rule changes are not pushed into the cache; readers see them once the entry expires.
pub const AUTO_OPS_RULES_TTL: Duration = Duration::from_secs(60);

/// Per-environment auto-ops rule snapshots under `{env}:autoOpsRule`.
#[derive(Debug, Clone)]
pub struct AutoOpsRulesCache<C> {
    inner: EntityCache<C, AutoOpsRules>,
}

impl<C> AutoOpsRulesCache<C> {
    /// Creates a cache over `backend`.
    pub fn new(backend: C) -> Self {
        Self {
            inner: EntityCache::new(backend, AUTO_OPS_RULES_KIND, AUTO_OPS_RULES_TTL),
        }
    }
}

impl<C: Getter> AutoOpsRulesCache<C> {
    /// Reads the rules of `environment_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`][bucketeer_cache_tier::Error::NotFound] once the entry
    /// has expired, or any read or decode error.
    pub async fn get(&self, environment_id: &str) -> Result<AutoOpsRules> {
        self.inner.get("", environment_id).await
    }
}

impl<C: Putter> AutoOpsRulesCache<C> {
    /// Stores the rules of `environment_id` for [`AUTO_OPS_RULES_TTL`].
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn put(&self, rules: &AutoOpsRules, environment_id: &str) -> Result<()> {
        self.inner.put("", environment_id, rules).await
    }
}
