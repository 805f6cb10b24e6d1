// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bucketeer_cache::ExperimentsCache;
use bucketeer_cache_tier::Putter;
use bucketeer_clock::Clock;
use bucketeer_proto::experiment::Experiments;

use crate::{CacherTelemetry, EnvironmentSource, ExperimentSource, FanOut, Result};

const NAME: &str = "experiment";

/// Copies the waiting and running experiments of every environment into every cache
/// instance.
#[derive(Debug)]
pub struct ExperimentCacher<S, C> {
    source: S,
    caches: FanOut<ExperimentsCache<C>>,
    telemetry: CacherTelemetry,
    clock: Clock,
}

impl<S, C> ExperimentCacher<S, C>
where
    S: EnvironmentSource + ExperimentSource,
    C: Putter,
{
    /// Creates a cacher that writes to each of `instances`.
    #[must_use]
    pub fn new(source: S, instances: Vec<C>, telemetry: CacherTelemetry, clock: Clock) -> Self {
        Self {
            source,
            caches: FanOut::new(instances.into_iter().map(ExperimentsCache::new).collect(), NAME, telemetry.clone()),
            telemetry,
            clock,
        }
    }

    /// Refreshes the experiments of every environment.
    ///
    /// # Errors
    ///
    /// Fails when the environments cannot be listed. An environment whose experiments
    /// cannot be listed is logged and skipped.
    pub async fn refresh_all_environment_caches(&self) -> Result<()> {
        let stopwatch = self.clock.stopwatch();
        let result = self.refresh_all().await;
        self.telemetry.record_cycle(NAME, result.is_ok(), stopwatch.elapsed());
        result
    }

    async fn refresh_all(&self) -> Result<()> {
        let environments = self
            .source
            .list_environments()
            .await
            .inspect_err(|error| tracing::error!(cacher = NAME, error = %error, "failed to list environments"))?;

        for environment in &environments {
            let environment_id = environment.id.as_str();
            let experiments = match self.source.list_experiments(environment_id).await {
                Ok(experiments) => experiments,
                Err(error) => {
                    tracing::error!(cacher = NAME, environment_id, error = %error, "failed to list experiments");
                    continue;
                }
            };

            let snapshot = Experiments { experiments };
            self.caches.put(environment_id, |cache| cache.put(&snapshot, environment_id)).await;
            self.telemetry.record_items(NAME, environment_id, snapshot.experiments.len());
        }

        tracing::debug!(cacher = NAME, environments = environments.len(), "refreshed experiment caches");
        Ok(())
    }
}
