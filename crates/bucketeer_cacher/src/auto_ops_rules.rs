// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bucketeer_cache::AutoOpsRulesCache;
use bucketeer_cache_tier::Putter;
use bucketeer_clock::Clock;
use bucketeer_proto::autoops::AutoOpsRules;

use crate::{AutoOpsRuleSource, CacherTelemetry, EnvironmentSource, FanOut, Result};

const NAME: &str = "auto_ops_rules";

/// Copies the auto-ops rules of every environment into every cache instance.
///
/// The snapshots expire after a minute, so a rule change reaches readers within a
/// minute even when a refresh is missed.
#[derive(Debug)]
pub struct AutoOpsRulesCacher<S, C> {
    source: S,
    caches: FanOut<AutoOpsRulesCache<C>>,
    telemetry: CacherTelemetry,
    clock: Clock,
}

impl<S, C> AutoOpsRulesCacher<S, C>
where
    S: EnvironmentSource + AutoOpsRuleSource,
    C: Putter,
{
    /// Creates a cacher that writes to each of `instances`.
    #[must_use]
    pub fn new(source: S, instances: Vec<C>, telemetry: CacherTelemetry, clock: Clock) -> Self {
        Self {
            source,
            caches: FanOut::new(instances.into_iter().map(AutoOpsRulesCache::new).collect(), NAME, telemetry.clone()),
            telemetry,
            clock,
        }
    }

    /// Refreshes the rules of every environment.
    ///
    /// # Errors
    ///
    /// Fails when the environments cannot be listed. An environment whose rules cannot
    /// be listed is logged and skipped.
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
            let rules = match self.source.list_auto_ops_rules(environment_id).await {
                Ok(rules) => rules,
                Err(error) => {
                    tracing::error!(cacher = NAME, environment_id, error = %error, "failed to list auto ops rules");
                    continue;
                }
            };

            let snapshot = AutoOpsRules { auto_ops_rules: rules };
            self.caches.put(environment_id, |cache| cache.put(&snapshot, environment_id)).await;
            self.telemetry.record_items(NAME, environment_id, snapshot.auto_ops_rules.len());
        }

        tracing::debug!(cacher = NAME, environments = environments.len(), "refreshed auto ops rules caches");
        Ok(())
    }
}
