// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use bucketeer_cache_tier::{Pipeliner, Result, SetReader};
use bucketeer_proto::user::UserAttributes;

use crate::key::{USER_ATTRIBUTE_KEYS_KIND, USER_ATTRIBUTE_KIND, make_key};

/// Distinct user attribute values seen per environment.
///
/// Each attribute key has a value set at `{env}:user_attr:{key}`. An index set at
/// `{env}:user_attr_keys` records which attribute keys exist, so listing them never needs a
/// scan. A write refreshes both sets and their TTL in one pipeline.
#[derive(Debug, Clone)]
pub struct UserAttributesCache<C> {
    backend: C,
}

impl<C> UserAttributesCache<C> {
    /// Creates a cache over `backend`.
    pub fn new(backend: C) -> Self {
        Self { backend }
    }
}

fn values_key(environment_id: &str, attribute: &str) -> String {
    make_key(USER_ATTRIBUTE_KIND, attribute, environment_id)
}

fn index_key(environment_id: &str) -> String {
    make_key(USER_ATTRIBUTE_KEYS_KIND, "", environment_id)
}

impl<C: Pipeliner> UserAttributesCache<C> {
    /// Adds the observed `attributes` and extends their lifetime to `ttl`.
    ///
    /// Attributes without values are ignored. Nothing is sent when no attribute has values.
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn put(&self, attributes: &UserAttributes, ttl: Duration) -> Result<()> {
        let environment_id = attributes.environment_id.as_str();
        let index = index_key(environment_id);

        let mut pipeline = self.backend.pipeline(false);
        for attribute in attributes.user_attributes.iter().filter(|a| !a.values.is_empty()) {
            let values = values_key(environment_id, &attribute.key);
            pipeline
                .s_add(values.as_str(), attribute.values.iter().map(String::as_str))
                .expire(values, ttl)
                .s_add(index.as_str(), [attribute.key.as_str()])
                .expire(index.as_str(), ttl);
        }

        if pipeline.is_empty() {
            return Ok(());
        }
        self.backend.exec(pipeline).await
    }
}

impl<C: SetReader> UserAttributesCache<C> {
    /// Returns the attribute keys seen in `environment_id`, sorted.
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn get_attribute_keys(&self, environment_id: &str) -> Result<Vec<String>> {
        let mut keys = self.backend.s_members(&index_key(environment_id)).await?;
        keys.sort_unstable();
        Ok(keys)
    }

    /// Returns the values seen for `attribute` in `environment_id`, sorted.
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn get_attribute_values(&self, environment_id: &str, attribute: &str) -> Result<Vec<String>> {
        let mut values = self.backend.s_members(&values_key(environment_id, attribute)).await?;
        values.sort_unstable();
        Ok(values)
    }
}
