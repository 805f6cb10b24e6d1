// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bucketeer_cache::FeaturesCache;
use bucketeer_cache_tier::Putter;
use bucketeer_clock::Clock;
use bucketeer_proto::feature::{Feature, Features};
use jiff::Timestamp;
use xxhash_rust::xxh64::Xxh64;

use crate::{CacherTelemetry, FanOut, FeatureSource, Result};

const NAME: &str = "feature_flag";

/// Archived flags stay cached this long after their last update, in seconds.
const ARCHIVED_RETENTION_SECS: i64 = 30 * 24 * 60 * 60;

/// Copies per-environment feature flag snapshots into every cache instance.
///
/// Before caching, flags that can no longer affect an evaluation are dropped: disabled
/// flags without an off variation, and flags archived more than 30 days ago. The snapshot
/// carries a [`features_id`] over what remains.
#[derive(Debug)]
pub struct FeatureFlagCacher<S, C> {
    source: S,
    caches: FanOut<FeaturesCache<C>>,
    telemetry: CacherTelemetry,
    clock: Clock,
}

impl<S, C> FeatureFlagCacher<S, C>
where
    S: FeatureSource,
    C: Putter,
{
    /// Creates a cacher that writes to each of `instances`.
    #[must_use]
    pub fn new(source: S, instances: Vec<C>, telemetry: CacherTelemetry, clock: Clock) -> Self {
        Self {
            source,
            caches: FanOut::new(instances.into_iter().map(FeaturesCache::new).collect(), NAME, telemetry.clone()),
            telemetry,
            clock,
        }
    }

    /// Refreshes the snapshot of every environment.
    ///
    /// # Errors
    ///
    /// Fails when the flags cannot be listed. Failed cache writes are logged and do not
    /// fail the refresh.
    pub async fn refresh_all_environment_caches(&self) -> Result<()> {
        let stopwatch = self.clock.stopwatch();
        let result = self.refresh_all().await;
        self.telemetry.record_cycle(NAME, result.is_ok(), stopwatch.elapsed());
        result
    }

    /// Refreshes the snapshot of one environment.
    ///
    /// An environment without flags gets an empty snapshot.
    ///
    /// # Errors
    ///
    /// Fails when the flags cannot be listed.
    pub async fn refresh_environment_cache(&self, environment_id: &str) -> Result<()> {
        let stopwatch = self.clock.stopwatch();
        let result = match self.source.list_features_by_environment(environment_id).await {
            Ok(features) => {
                self.put(environment_id, features).await;
                Ok(())
            }
            Err(error) => {
                tracing::error!(cacher = NAME, environment_id, error = %error, "failed to list features");
                Err(error.into())
            }
        };
        self.telemetry.record_cycle(NAME, result.is_ok(), stopwatch.elapsed());
        result
    }

    async fn refresh_all(&self) -> Result<()> {
        let environments = self
            .source
            .list_all_environment_features()
            .await
            .inspect_err(|error| tracing::error!(cacher = NAME, error = %error, "failed to list all environment features"))?;

        let count = environments.len();
        for environment in environments {
            self.put(&environment.environment_id, environment.features).await;
        }

        tracing::debug!(cacher = NAME, environments = count, "refreshed feature flag caches");
        Ok(())
    }

    async fn put(&self, environment_id: &str, features: Vec<Feature>) -> usize {
        let features = cacheable_features(features, self.clock.timestamp());
        let snapshot = Features {
            id: features_id(&features),
            features,
        };

        let written = self.caches.put(environment_id, |cache| cache.put(&snapshot, environment_id)).await;
        self.telemetry.record_items(NAME, environment_id, snapshot.features.len());
        written
    }
}

/// Computes the content fingerprint of a flag list.
///
/// The fingerprint covers each flag's id and version, in order, so SDKs can tell that a
/// snapshot has not changed without comparing it. Equal lists always produce the same
/// fingerprint.
///
/// # Examples
///
/// ```
/// use bucketeer_cacher::features_id;
/// use bucketeer_proto::feature::Feature;
///
/// let flags = vec![Feature { id: "checkout".to_string(), version: 3, ..Feature::default() }];
/// assert_eq!(features_id(&flags), features_id(&flags.clone()));
/// ```
#[must_use]
pub fn features_id(features: &[Feature]) -> String {
    let mut hasher = Xxh64::new(0);
    for feature in features {
        hasher.update(format!("{}:{}", feature.id, feature.version).as_bytes());
    }
    hasher.digest().to_string()
}

/// Keeps the flags worth serving at `now`.
fn cacheable_features(features: Vec<Feature>, now: Timestamp) -> Vec<Feature> {
    features.into_iter().filter(|feature| is_cacheable(feature, now)).collect()
}

fn is_cacheable(feature: &Feature, now: Timestamp) -> bool {
    let disabled_without_off_variation = !feature.enabled && feature.off_variation.is_empty();
    let archived_long_ago = feature.archived && feature.updated_at < now.as_second() - ARCHIVED_RETENTION_SECS;
    !disabled_without_off_variation && !archived_long_ago
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_769_614_200;

    fn now() -> Timestamp {
        Timestamp::from_second(NOW).unwrap()
    }

    fn flag(id: &str) -> Feature {
        Feature {
            id: id.to_string(),
            enabled: true,
            off_variation: "off".to_string(),
            updated_at: NOW,
            ..Feature::default()
        }
    }

    #[test]
    fn disabled_flag_needs_off_variation() {
        let served = Feature {
            enabled: false,
            ..flag("served")
        };
        let unserved = Feature {
            enabled: false,
            off_variation: String::new(),
            ..flag("unserved")
        };
        let enabled = Feature {
            off_variation: String::new(),
            ..flag("enabled")
        };

        assert!(is_cacheable(&served, now()));
        assert!(!is_cacheable(&unserved, now()));
        assert!(is_cacheable(&enabled, now()));
    }

    #[test]
    fn archived_flags_expire_after_thirty_days() {
        let recent = Feature {
            archived: true,
            updated_at: NOW - ARCHIVED_RETENTION_SECS,
            ..flag("recent")
        };
        let old = Feature {
            archived: true,
            updated_at: NOW - ARCHIVED_RETENTION_SECS - 1,
            ..flag("old")
        };
        let old_but_active = Feature {
            updated_at: 0,
            ..flag("active")
        };

        assert!(is_cacheable(&recent, now()));
        assert!(!is_cacheable(&old, now()));
        assert!(is_cacheable(&old_but_active, now()));
    }

    #[test]
    fn filter_keeps_order_of_survivors() {
        let features = vec![
            flag("a"),
            Feature {
                enabled: false,
                off_variation: String::new(),
                ..flag("b")
            },
            flag("c"),
        ];

        let ids: Vec<_> = cacheable_features(features, now()).into_iter().map(|f| f.id).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn id_depends_on_ids_versions_and_order() {
        let a = Feature { version: 1, ..flag("a") };
        let b = Feature { version: 1, ..flag("b") };
        let base = features_id(&[a.clone(), b.clone()]);

        assert_eq!(base, features_id(&[a.clone(), b.clone()]));
        assert_ne!(base, features_id(&[b.clone(), a.clone()]));
        assert_ne!(base, features_id(&[Feature { version: 2, ..a.clone() }, b]));
        assert_ne!(base, features_id(&[a]));
    }

    #[test]
    fn id_ignores_fields_other_than_version() {
        let a = flag("a");
        let renamed = Feature {
            name: "renamed".to_string(),
            ..a.clone()
        };
        assert_eq!(features_id(&[a]), features_id(&[renamed]));
    }

    #[test]
    fn empty_list_has_seed_digest() {
        assert_eq!(features_id(&[]), Xxh64::new(0).digest().to_string());
    }
}
