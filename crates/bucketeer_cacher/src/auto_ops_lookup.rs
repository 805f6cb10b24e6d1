// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bucketeer_cache::AutoOpsRulesCache;
use bucketeer_cache_tier::{Getter, Putter};
use bucketeer_flight::FlightGroup;
use bucketeer_proto::autoops::{AutoOpsRule, AutoOpsRules};

use crate::{AutoOpsRuleSource, Result, SourceError};

type Flights = FlightGroup<String, std::result::Result<Vec<AutoOpsRule>, SourceError>>;

/// Read-through lookup of an environment's auto-ops rules for event hot paths.
///
/// Rules are served from the cache. Concurrent lookups for one environment share a single
/// cache read and, on a miss, a single upstream request whose result is written back to
/// the cache. A failed upstream request is handed to the lookups waiting on it and then
/// forgotten, so the next lookup asks again.
///
/// A rule change reaches this lookup once the cached rules expire, within a minute.
///
/// # Examples
///
/// ```
/// use bucketeer_cache_memory::InMemoryBackend;
/// use bucketeer_cacher::{AutoOpsRuleSource, AutoOpsRulesLookup, SourceError};
/// use bucketeer_proto::autoops::AutoOpsRule;
///
/// struct Upstream;
///
/// impl AutoOpsRuleSource for Upstream {
///     async fn list_auto_ops_rules(&self, _environment_id: &str) -> Result<Vec<AutoOpsRule>, SourceError> {
///         Ok(vec![AutoOpsRule { id: "rule-1".to_string(), ..AutoOpsRule::default() }])
///     }
/// }
///
/// # futures::executor::block_on(async {
/// let lookup = AutoOpsRulesLookup::new(Upstream, InMemoryBackend::new());
/// let rules = lookup.list_auto_ops_rules("env-1").await?;
/// assert_eq!(rules[0].id, "rule-1");
/// # Ok::<(), bucketeer_cacher::Error>(())
/// # });
/// ```
#[derive(Debug)]
pub struct AutoOpsRulesLookup<S, C> {
    source: S,
    cache: AutoOpsRulesCache<C>,
    flights: Flights,
}

impl<S, C> AutoOpsRulesLookup<S, C> {
    /// Returns the source rules are fetched from on a miss.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S, C> AutoOpsRulesLookup<S, C>
where
    S: AutoOpsRuleSource,
    C: Getter + Putter,
{
    /// Creates a lookup backed by `cache`, falling back to `source`.
    #[must_use]
    pub fn new(source: S, cache: C) -> Self {
        Self {
            source,
            cache: AutoOpsRulesCache::new(cache),
            flights: FlightGroup::new(),
        }
    }

    /// Returns every auto-ops rule of `environment_id`.
    ///
    /// # Errors
    ///
    /// Fails when the rules are not cached and the source cannot list them. Cache
    /// failures are logged and never fail the lookup.
    pub async fn list_auto_ops_rules(&self, environment_id: &str) -> Result<Vec<AutoOpsRule>> {
        let key = format!("{environment_id}:listAutoOpsRules");
        Ok(self.flights.work(key, || self.load(environment_id)).await?)
    }

    /// Returns the auto-ops rules of `environment_id` that belong to `feature_id`.
    ///
    /// The environment's full rule set is looked up and filtered, so lookups for
    /// different flags share one cache entry and one upstream request.
    ///
    /// # Errors
    ///
    /// Same as [`list_auto_ops_rules`](Self::list_auto_ops_rules).
    pub async fn list_auto_ops_rules_for_feature(&self, environment_id: &str, feature_id: &str) -> Result<Vec<AutoOpsRule>> {
        let mut rules = self.list_auto_ops_rules(environment_id).await?;
        rules.retain(|rule| rule.feature_id == feature_id);
        Ok(rules)
    }

    async fn load(&self, environment_id: &str) -> std::result::Result<Vec<AutoOpsRule>, SourceError> {
        match self.cache.get(environment_id).await {
            Ok(cached) => return Ok(cached.auto_ops_rules),
            Err(error) if error.is_not_found() => {}
            Err(error) => {
                tracing::warn!(environment_id, error = %error, "failed to get auto ops rules from cache");
            }
        }

        let rules = self.source.list_auto_ops_rules(environment_id).await?;

        let snapshot = AutoOpsRules {
            auto_ops_rules: rules,
        };
        if let Err(error) = self.cache.put(&snapshot, environment_id).await {
            tracing::warn!(environment_id, error = %error, "failed to put auto ops rules into cache");
        }
        Ok(snapshot.auto_ops_rules)
    }
}
