// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bucketeer_cache::EnvironmentApiKeyCache;
use bucketeer_cache_tier::Putter;
use bucketeer_clock::Clock;
use bucketeer_proto::account::EnvironmentApiKey;

use crate::{ApiKeySource, CacherTelemetry, FanOut, Result};

const NAME: &str = "api_key";

/// Copies API keys and their environments into every cache instance.
#[derive(Debug)]
pub struct ApiKeyCacher<S, C> {
    source: S,
    caches: FanOut<EnvironmentApiKeyCache<C>>,
    telemetry: CacherTelemetry,
    clock: Clock,
}

impl<S, C> ApiKeyCacher<S, C>
where
    S: ApiKeySource,
    C: Putter,
{
    /// Creates a cacher that writes to each of `instances`.
    #[must_use]
    pub fn new(source: S, instances: Vec<C>, telemetry: CacherTelemetry, clock: Clock) -> Self {
        Self {
            source,
            caches: FanOut::new(
                instances.into_iter().map(EnvironmentApiKeyCache::new).collect(),
                NAME,
                telemetry.clone(),
            ),
            telemetry,
            clock,
        }
    }

    /// Refreshes every API key.
    ///
    /// Keys without a key string cannot be addressed and are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Fails when the keys cannot be listed.
    pub async fn refresh_all_environment_caches(&self) -> Result<()> {
        let stopwatch = self.clock.stopwatch();
        let result = self.refresh_all().await;
        self.telemetry.record_cycle(NAME, result.is_ok(), stopwatch.elapsed());
        result
    }

    /// Refreshes one API key.
    ///
    /// # Errors
    ///
    /// Fails when the key cannot be fetched.
    pub async fn refresh_api_key(&self, api_key: &str) -> Result<()> {
        let stopwatch = self.clock.stopwatch();
        let result = self.refresh_one(api_key).await;
        self.telemetry.record_cycle(NAME, result.is_ok(), stopwatch.elapsed());
        result
    }

    async fn refresh_one(&self, api_key: &str) -> Result<()> {
        let key = self
            .source
            .get_environment_api_key(api_key)
            .await
            .inspect_err(|error| tracing::error!(cacher = NAME, error = %error, "failed to get environment API key"))?;
        self.put(&key).await;
        Ok(())
    }

    async fn refresh_all(&self) -> Result<()> {
        let keys = self
            .source
            .list_all_environment_api_keys()
            .await
            .inspect_err(|error| tracing::error!(cacher = NAME, error = %error, "failed to list environment API keys"))?;

        let mut cached = 0;
        for key in &keys {
            if key.api_key.as_ref().is_none_or(|api_key| api_key.id.is_empty()) {
                tracing::warn!(
                    cacher = NAME,
                    environment_id = %key.environment_namespace,
                    "skipping environment API key without a key id"
                );
                continue;
            }
            self.put(key).await;
            cached += 1;
        }

        tracing::debug!(cacher = NAME, keys = cached, "refreshed environment API key caches");
        Ok(())
    }

    async fn put(&self, key: &EnvironmentApiKey) -> usize {
        self.caches.put(&key.environment_namespace, |cache| cache.put(key)).await
    }
}
