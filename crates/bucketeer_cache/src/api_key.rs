// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use bucketeer_cache_tier::{Error, Getter, Putter, Result};
use bucketeer_proto::account::EnvironmentApiKey;

use crate::EntityCache;
use crate::key::ENVIRONMENT_API_KEY_KIND;

/// Lifetime of cached API keys.
pub const ENVIRONMENT_API_KEY_TTL: Duration = Duration::from_secs(60);

/// API keys and the environment each one grants access to.
///
/// Entries are global, keyed by the key string as `environment_apikey:{key}`.
#[derive(Debug, Clone)]
pub struct EnvironmentApiKeyCache<C> {
    inner: EntityCache<C, EnvironmentApiKey>,
}

impl<C> EnvironmentApiKeyCache<C> {
    /// Creates a cache over `backend`.
    pub fn new(backend: C) -> Self {
        Self {
            inner: EntityCache::new(backend, ENVIRONMENT_API_KEY_KIND, ENVIRONMENT_API_KEY_TTL),
        }
    }
}

impl<C: Getter> EnvironmentApiKeyCache<C> {
    /// Reads the entry of `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the key is not cached, or any read or decode error.
    pub async fn get(&self, api_key: &str) -> Result<EnvironmentApiKey> {
        self.inner.get(api_key, "").await
    }
}

impl<C: Putter> EnvironmentApiKeyCache<C> {
    /// Stores `value` under the id of its API key.
    ///
    /// # Errors
    ///
    /// Fails without writing if `value` carries no API key, and returns any backend error
    /// unchanged.
    pub async fn put(&self, value: &EnvironmentApiKey) -> Result<()> {
        let Some(api_key) = value.api_key.as_ref().filter(|key| !key.id.is_empty()) else {
            return Err(Error::backend("environment API key has no key id"));
        };
        self.inner.put(&api_key.id, "", value).await
    }
}

#[cfg(test)]
mod tests {
    use bucketeer_cache_tier::testing::MockBackend;
    use bucketeer_proto::account::ApiKey;

    use super::*;

    #[test]
    fn entries_are_global_and_expire_after_a_minute() {
        futures::executor::block_on(async {
            let backend = MockBackend::new();
            let cache = EnvironmentApiKeyCache::new(backend.clone());
            let value = EnvironmentApiKey {
                project_id: "project".to_string(),
                api_key: Some(ApiKey {
                    id: "key-1".to_string(),
                    ..ApiKey::default()
                }),
                ..EnvironmentApiKey::default()
            };

            cache.put(&value).await.unwrap();

            assert_eq!(backend.keys(), vec!["environment_apikey:key-1".to_string()]);
            assert_eq!(cache.get("key-1").await.unwrap(), value);
        });
    }

    #[test]
    fn missing_key_id_is_rejected_without_writing() {
        futures::executor::block_on(async {
            let backend = MockBackend::new();
            let cache = EnvironmentApiKeyCache::new(backend.clone());

            cache.put(&EnvironmentApiKey::default()).await.unwrap_err();

            assert!(backend.operations().is_empty());
        });
    }
}
