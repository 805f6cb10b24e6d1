// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Refresh cycles end to end, against mock cache instances and an in-memory source.

use std::collections::HashMap;

use bucketeer_cache::{AUTO_OPS_RULES_TTL, ExperimentsCache, FeaturesCache, SegmentUsersCache};
use bucketeer_cache_tier::testing::{CacheOp, MockBackend};
use bucketeer_cacher::{
    ApiKeyCacher, ApiKeySource, AutoOpsRuleSource, AutoOpsRulesCacher, CacherTelemetry, EnvironmentFeatures, EnvironmentSource, Error,
    ExperimentCacher, ExperimentSource, FeatureFlagCacher, FeatureSource, InUseSegment, SegmentSource, SegmentUserCacher, SourceError,
    create_meter, features_id,
};
use bucketeer_clock::{Clock, ClockControl};
use bucketeer_proto::account::{ApiKey, EnvironmentApiKey};
use bucketeer_proto::autoops::AutoOpsRule;
use bucketeer_proto::environment::EnvironmentV2;
use bucketeer_proto::experiment::Experiment;
use bucketeer_proto::feature::Feature;
use bucketeer_proto::segment::SegmentUser;
use jiff::Timestamp;
use opentelemetry::KeyValue;
use testing_aids::{LogCapture, MetricTester};

/// 2026-01-28T15:30:00Z
const NOW: i64 = 1_769_614_200;
const DAY: i64 = 24 * 60 * 60;

/// Source of truth held in memory. Lookups for segments, experiments and rules that are
/// not listed fail.
#[derive(Default)]
struct Store {
    fail_lists: bool,
    features: Vec<EnvironmentFeatures>,
    segments: Vec<InUseSegment>,
    segment_users: HashMap<String, Vec<SegmentUser>>,
    api_keys: Vec<EnvironmentApiKey>,
    environments: Vec<EnvironmentV2>,
    experiments: HashMap<String, Vec<Experiment>>,
    auto_ops_rules: HashMap<String, Vec<AutoOpsRule>>,
}

impl Store {
    fn check(&self) -> Result<(), SourceError> {
        if self.fail_lists {
            Err(SourceError::new("database is unavailable"))
        } else {
            Ok(())
        }
    }
}

impl FeatureSource for Store {
    async fn list_features_by_environment(&self, environment_id: &str) -> Result<Vec<Feature>, SourceError> {
        self.check()?;
        Ok(self
            .features
            .iter()
            .find(|environment| environment.environment_id == environment_id)
            .map(|environment| environment.features.clone())
            .unwrap_or_default())
    }

    async fn list_all_environment_features(&self) -> Result<Vec<EnvironmentFeatures>, SourceError> {
        self.check()?;
        Ok(self.features.clone())
    }
}

impl SegmentSource for Store {
    async fn list_all_in_use_segments(&self) -> Result<Vec<InUseSegment>, SourceError> {
        self.check()?;
        Ok(self.segments.clone())
    }

    async fn list_segment_users_by_segment(&self, segment_id: &str, _environment_id: &str) -> Result<Vec<SegmentUser>, SourceError> {
        self.segment_users
            .get(segment_id)
            .cloned()
            .ok_or_else(|| SourceError::new(format!("failed to query users of {segment_id}")))
    }
}

impl ApiKeySource for Store {
    async fn list_all_environment_api_keys(&self) -> Result<Vec<EnvironmentApiKey>, SourceError> {
        self.check()?;
        Ok(self.api_keys.clone())
    }

    async fn get_environment_api_key(&self, api_key: &str) -> Result<EnvironmentApiKey, SourceError> {
        self.api_keys
            .iter()
            .find(|key| key.api_key.as_ref().is_some_and(|k| k.id == api_key))
            .cloned()
            .ok_or_else(|| SourceError::new("api key not found"))
    }
}

impl EnvironmentSource for Store {
    async fn list_environments(&self) -> Result<Vec<EnvironmentV2>, SourceError> {
        self.check()?;
        Ok(self.environments.clone())
    }
}

impl ExperimentSource for Store {
    async fn list_experiments(&self, environment_id: &str) -> Result<Vec<Experiment>, SourceError> {
        self.experiments
            .get(environment_id)
            .cloned()
            .ok_or_else(|| SourceError::new("experiment service unavailable"))
    }
}

impl AutoOpsRuleSource for Store {
    async fn list_auto_ops_rules(&self, environment_id: &str) -> Result<Vec<AutoOpsRule>, SourceError> {
        self.auto_ops_rules
            .get(environment_id)
            .cloned()
            .ok_or_else(|| SourceError::new("auto ops service unavailable"))
    }
}

fn clock() -> Clock {
    ClockControl::new_at(Timestamp::from_second(NOW).unwrap()).to_clock()
}

fn flag(id: &str, version: i32) -> Feature {
    Feature {
        id: id.to_string(),
        version,
        enabled: true,
        off_variation: "off".to_string(),
        updated_at: NOW - DAY,
        ..Feature::default()
    }
}

fn environment(id: &str) -> EnvironmentV2 {
    EnvironmentV2 {
        id: id.to_string(),
        ..EnvironmentV2::default()
    }
}

fn environment_features(environment_id: &str, features: Vec<Feature>) -> EnvironmentFeatures {
    EnvironmentFeatures {
        environment_id: environment_id.to_string(),
        features,
    }
}

fn feature_store() -> Store {
    Store {
        features: vec![
            environment_features(
                "env-1",
                vec![
                    flag("checkout", 3),
                    Feature {
                        enabled: false,
                        off_variation: String::new(),
                        ..flag("unserved", 1)
                    },
                    Feature {
                        archived: true,
                        updated_at: NOW - 31 * DAY,
                        ..flag("retired", 7)
                    },
                    Feature {
                        archived: true,
                        ..flag("recently-archived", 2)
                    },
                ],
            ),
            environment_features("env-2", vec![flag("banner", 1)]),
        ],
        ..Store::default()
    }
}

#[tokio::test]
async fn feature_snapshots_are_filtered_and_fingerprinted() {
    let backend = MockBackend::new();
    let cacher = FeatureFlagCacher::new(feature_store(), vec![backend.clone()], CacherTelemetry::disabled(), clock());

    cacher.refresh_all_environment_caches().await.unwrap();

    let cache = FeaturesCache::new(backend);
    let env_1 = cache.get("env-1").await.unwrap();
    let ids: Vec<_> = env_1.features.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, ["checkout", "recently-archived"]);
    assert_eq!(env_1.id, features_id(&env_1.features));

    let env_2 = cache.get("env-2").await.unwrap();
    assert_eq!(env_2.features, vec![flag("banner", 1)]);
}

#[tokio::test]
async fn unchanged_source_produces_identical_snapshots() {
    let backend = MockBackend::new();
    let cacher = FeatureFlagCacher::new(feature_store(), vec![backend.clone()], CacherTelemetry::disabled(), clock());

    cacher.refresh_all_environment_caches().await.unwrap();
    let first = backend.bytes("env-1:features").unwrap();
    cacher.refresh_all_environment_caches().await.unwrap();
    let second = backend.bytes("env-1:features").unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn list_failure_aborts_before_any_write() {
    let tester = MetricTester::new();
    let telemetry = CacherTelemetry::new(Some(&create_meter(tester.meter_provider())));
    let backend = MockBackend::new();
    let store = Store {
        fail_lists: true,
        ..feature_store()
    };
    let cacher = FeatureFlagCacher::new(store, vec![backend.clone()], telemetry, clock());

    let error = cacher.refresh_all_environment_caches().await.unwrap_err();

    assert!(matches!(error, Error::Source(_)));
    assert_eq!(error.to_string(), "database is unavailable");
    assert!(backend.operations().is_empty());
    assert_eq!(
        tester.counter_total(
            "bucketeer.cacher.handled",
            &[KeyValue::new("cacher.name", "feature_flag"), KeyValue::new("cacher.result", "fail")]
        ),
        1
    );
}

#[tokio::test]
async fn unknown_environment_gets_empty_snapshot() {
    let backend = MockBackend::new();
    let cacher = FeatureFlagCacher::new(feature_store(), vec![backend.clone()], CacherTelemetry::disabled(), clock());

    cacher.refresh_environment_cache("env-9").await.unwrap();

    let snapshot = FeaturesCache::new(backend).get("env-9").await.unwrap();
    assert!(snapshot.features.is_empty());
    assert_eq!(snapshot.id, features_id(&[]));
}

#[tokio::test]
async fn single_environment_refresh_touches_only_that_environment() {
    let backend = MockBackend::new();
    let cacher = FeatureFlagCacher::new(feature_store(), vec![backend.clone()], CacherTelemetry::disabled(), clock());

    cacher.refresh_environment_cache("env-2").await.unwrap();

    assert_eq!(backend.keys(), ["env-2:features"]);
}

#[tokio::test]
async fn broken_instance_does_not_fail_the_refresh() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();

    let broken = MockBackend::new();
    broken.fail_when(|op| matches!(op, CacheOp::Put { .. }));
    let healthy = MockBackend::new();
    let cacher = FeatureFlagCacher::new(
        feature_store(),
        vec![broken.clone(), healthy.clone()],
        CacherTelemetry::disabled(),
        clock(),
    );

    cacher.refresh_all_environment_caches().await.unwrap();

    assert!(healthy.contains_key("env-1:features"));
    assert!(healthy.contains_key("env-2:features"));
    assert_eq!(broken.entry_count(), 0);
    assert_eq!(capture.count_lines_containing(&["failed to put cache", "instance=0"]), 2);
}

#[tokio::test]
async fn successful_cycle_is_metered() {
    let tester = MetricTester::new();
    let telemetry = CacherTelemetry::new(Some(&create_meter(tester.meter_provider())));
    let cacher = FeatureFlagCacher::new(feature_store(), vec![MockBackend::new(), MockBackend::new()], telemetry, clock());

    cacher.refresh_all_environment_caches().await.unwrap();

    let name = KeyValue::new("cacher.name", "feature_flag");
    assert_eq!(
        tester.counter_total("bucketeer.cacher.handled", &[name.clone(), KeyValue::new("cacher.result", "success")]),
        1
    );
    assert_eq!(tester.histogram_count("bucketeer.cacher.duration", &[name.clone()]), 1);
    assert_eq!(
        tester.gauge_value("bucketeer.cacher.items", &[name.clone(), KeyValue::new("environment.id", "env-1")]),
        Some(2)
    );
    assert_eq!(
        tester.counter_total("bucketeer.cache.fanout.writes", &[name, KeyValue::new("cacher.result", "success")]),
        4
    );
}

fn segment_user(segment_id: &str, user_id: &str) -> SegmentUser {
    SegmentUser {
        id: format!("{segment_id}:{user_id}"),
        segment_id: segment_id.to_string(),
        user_id: user_id.to_string(),
        ..SegmentUser::default()
    }
}

fn in_use(segment_id: &str, environment_id: &str, updated_at: i64) -> InUseSegment {
    InUseSegment {
        segment_id: segment_id.to_string(),
        environment_id: environment_id.to_string(),
        updated_at,
    }
}

#[tokio::test]
async fn failed_segment_is_skipped() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();

    let store = Store {
        segments: vec![in_use("seg-1", "env-1", NOW - 10), in_use("seg-2", "env-2", NOW - 20)],
        segment_users: HashMap::from([("seg-2".to_string(), vec![segment_user("seg-2", "user-1")])]),
        ..Store::default()
    };
    let backend = MockBackend::new();
    let cacher = SegmentUserCacher::new(store, vec![backend.clone()], CacherTelemetry::disabled(), clock());

    cacher.refresh_all_environment_caches().await.unwrap();

    assert_eq!(backend.keys(), ["env-2:segment_users:seg-2"]);
    let cached = SegmentUsersCache::new(backend).get("seg-2", "env-2").await.unwrap();
    assert_eq!(cached.users, vec![segment_user("seg-2", "user-1")]);
    assert_eq!(cached.updated_at, NOW - 20);

    assert_eq!(capture.count_lines_containing(&["failed to list segment users", "seg-1"]), 1);
    capture.assert_not_contains("seg-2");
}

#[tokio::test]
async fn segment_list_failure_is_returned() {
    let store = Store {
        fail_lists: true,
        ..Store::default()
    };
    let cacher = SegmentUserCacher::new(store, vec![MockBackend::new()], CacherTelemetry::disabled(), clock());

    assert!(matches!(cacher.refresh_all_environment_caches().await, Err(Error::Source(_))));
}

#[tokio::test]
async fn single_segment_refresh_is_stamped_now() {
    let store = Store {
        segment_users: HashMap::from([("seg-3".to_string(), vec![segment_user("seg-3", "user-9")])]),
        ..Store::default()
    };
    let backend = MockBackend::new();
    let cacher = SegmentUserCacher::new(store, vec![backend.clone()], CacherTelemetry::disabled(), clock());

    cacher.refresh_segment_cache("env-3", "seg-3").await.unwrap();

    let cached = SegmentUsersCache::new(backend.clone()).get("seg-3", "env-3").await.unwrap();
    assert_eq!(cached.updated_at, NOW);

    assert!(cacher.refresh_segment_cache("env-3", "seg-404").await.is_err());
    assert_eq!(backend.entry_count(), 1);
}

fn api_key(id: &str, environment_id: &str) -> EnvironmentApiKey {
    EnvironmentApiKey {
        environment_namespace: environment_id.to_string(),
        api_key: Some(ApiKey {
            id: id.to_string(),
            name: format!("{id} name"),
            ..ApiKey::default()
        }),
        ..EnvironmentApiKey::default()
    }
}

#[tokio::test]
async fn api_keys_without_id_are_skipped() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();

    let store = Store {
        api_keys: vec![
            api_key("key-1", "env-1"),
            EnvironmentApiKey {
                environment_namespace: "env-2".to_string(),
                ..EnvironmentApiKey::default()
            },
        ],
        ..Store::default()
    };
    let backend = MockBackend::new();
    let cacher = ApiKeyCacher::new(store, vec![backend.clone()], CacherTelemetry::disabled(), clock());

    cacher.refresh_all_environment_caches().await.unwrap();

    assert_eq!(backend.keys(), ["environment_apikey:key-1"]);
    capture.assert_contains("skipping environment API key without a key id");
    capture.assert_not_contains("failed to put cache");
}

#[tokio::test]
async fn single_api_key_refresh() {
    let store = Store {
        api_keys: vec![api_key("key-1", "env-1"), api_key("key-2", "env-2")],
        ..Store::default()
    };
    let backend = MockBackend::new();
    let cacher = ApiKeyCacher::new(store, vec![backend.clone()], CacherTelemetry::disabled(), clock());

    cacher.refresh_api_key("key-2").await.unwrap();
    assert_eq!(backend.keys(), ["environment_apikey:key-2"]);

    assert!(matches!(cacher.refresh_api_key("key-404").await, Err(Error::Source(_))));
}

#[tokio::test]
async fn on_demand_refreshes_are_metered() {
    let tester = MetricTester::new();
    let telemetry = CacherTelemetry::new(Some(&create_meter(tester.meter_provider())));
    let store = || Store {
        segment_users: HashMap::from([("seg-1".to_string(), vec![segment_user("seg-1", "user-1")])]),
        api_keys: vec![api_key("key-1", "env-1")],
        ..Store::default()
    };
    let segments = SegmentUserCacher::new(store(), vec![MockBackend::new()], telemetry.clone(), clock());
    let api_keys = ApiKeyCacher::new(store(), vec![MockBackend::new()], telemetry, clock());

    segments.refresh_segment_cache("env-1", "seg-1").await.unwrap();
    segments.refresh_segment_cache("env-1", "seg-404").await.unwrap_err();
    api_keys.refresh_api_key("key-1").await.unwrap();
    api_keys.refresh_api_key("key-404").await.unwrap_err();

    for cacher in ["segment_user", "api_key"] {
        let name = KeyValue::new("cacher.name", cacher);
        for result in ["success", "fail"] {
            assert_eq!(
                tester.counter_total("bucketeer.cacher.handled", &[name.clone(), KeyValue::new("cacher.result", result)]),
                1,
                "{cacher} {result}"
            );
        }
        assert_eq!(tester.histogram_count("bucketeer.cacher.duration", &[name]), 2);
    }
}

#[tokio::test]
async fn experiments_skip_failed_environments() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();

    let experiment = Experiment {
        id: "exp-1".to_string(),
        feature_id: "checkout".to_string(),
        ..Experiment::default()
    };
    let store = Store {
        environments: vec![environment("env-1"), environment("env-2")],
        experiments: HashMap::from([("env-1".to_string(), vec![experiment.clone()])]),
        ..Store::default()
    };
    let backend = MockBackend::new();
    let cacher = ExperimentCacher::new(store, vec![backend.clone()], CacherTelemetry::disabled(), clock());

    cacher.refresh_all_environment_caches().await.unwrap();

    assert_eq!(backend.keys(), ["env-1:experiments"]);
    assert_eq!(ExperimentsCache::new(backend).get("env-1").await.unwrap().experiments, vec![experiment]);
    assert_eq!(capture.count_lines_containing(&["failed to list experiments", "env-2"]), 1);
}

#[tokio::test]
async fn auto_ops_rules_are_cached_for_a_minute() {
    let rule = AutoOpsRule {
        id: "rule-1".to_string(),
        feature_id: "checkout".to_string(),
        ..AutoOpsRule::default()
    };
    let store = Store {
        environments: vec![environment("env-1"), environment("env-2")],
        auto_ops_rules: HashMap::from([("env-1".to_string(), vec![rule]), ("env-2".to_string(), Vec::new())]),
        ..Store::default()
    };
    let backend = MockBackend::new();
    let cacher = AutoOpsRulesCacher::new(store, vec![backend.clone()], CacherTelemetry::disabled(), clock());

    cacher.refresh_all_environment_caches().await.unwrap();

    let ttls: Vec<_> = backend
        .operations()
        .into_iter()
        .filter_map(|op| match op {
            CacheOp::Put { key, ttl, .. } => Some((key, ttl)),
            _ => None,
        })
        .collect();
    assert_eq!(
        ttls,
        [
            ("env-1:autoOpsRule".to_string(), AUTO_OPS_RULES_TTL),
            ("env-2:autoOpsRule".to_string(), AUTO_OPS_RULES_TTL)
        ]
    );
}

#[tokio::test]
async fn environment_list_failure_is_returned() {
    let store = Store {
        fail_lists: true,
        ..Store::default()
    };
    let backend = MockBackend::new();
    let cacher = AutoOpsRulesCacher::new(store, vec![backend.clone()], CacherTelemetry::disabled(), clock());

    assert!(matches!(cacher.refresh_all_environment_caches().await, Err(Error::Source(_))));
    assert!(backend.operations().is_empty());
}
