// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Read-through auto-ops rule lookups.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use bucketeer_cache::{AUTO_OPS_RULES_TTL, AutoOpsRulesCache};
use bucketeer_cache_memory::InMemoryBackend;
use bucketeer_cache_tier::testing::{CacheOp, MockBackend};
use bucketeer_cacher::{AutoOpsRuleSource, AutoOpsRulesLookup, Error, SourceError};
use bucketeer_proto::autoops::{AutoOpsRule, AutoOpsRules};
use futures::future::join_all;
use testing_aids::LogCapture;

/// Upstream that takes a while to answer and counts its calls.
#[derive(Default)]
struct CountingSource {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl CountingSource {
    fn failing() -> Self {
        Self {
            failing: AtomicBool::new(true),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AutoOpsRuleSource for CountingSource {
    async fn list_auto_ops_rules(&self, environment_id: &str) -> Result<Vec<AutoOpsRule>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;

        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::new("auto ops service unavailable"));
        }
        Ok(vec![rule("rule-1", "checkout", environment_id), rule("rule-2", "banner", environment_id)])
    }
}

fn rule(id: &str, feature_id: &str, environment_id: &str) -> AutoOpsRule {
    AutoOpsRule {
        id: format!("{environment_id}/{id}"),
        feature_id: feature_id.to_string(),
        ..AutoOpsRule::default()
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_misses_share_one_upstream_call() {
    let lookup = AutoOpsRulesLookup::new(CountingSource::default(), InMemoryBackend::new());

    let results = join_all((0..8).map(|_| lookup.list_auto_ops_rules("env-1"))).await;

    let first = results[0].as_ref().unwrap();
    assert_eq!(first.len(), 2);
    for result in &results {
        assert_eq!(result.as_ref().unwrap(), first);
    }

    let again = lookup.list_auto_ops_rules("env-1").await.unwrap();
    assert_eq!(&again, first);
    assert_eq!(lookup_calls(&lookup), 1);
}

fn lookup_calls<C>(lookup: &AutoOpsRulesLookup<CountingSource, C>) -> usize {
    lookup.source().calls()
}

#[tokio::test(start_paused = true)]
async fn environments_do_not_share_flights() {
    let lookup = AutoOpsRulesLookup::new(CountingSource::default(), InMemoryBackend::new());

    let (env_1, env_2) = futures::join!(lookup.list_auto_ops_rules("env-1"), lookup.list_auto_ops_rules("env-2"));

    assert_eq!(env_1.unwrap()[0].id, "env-1/rule-1");
    assert_eq!(env_2.unwrap()[0].id, "env-2/rule-1");
    assert_eq!(lookup_calls(&lookup), 2);
}

#[tokio::test(start_paused = true)]
async fn cached_rules_skip_the_source() {
    let backend = InMemoryBackend::new();
    let cached = AutoOpsRules {
        auto_ops_rules: vec![rule("cached", "checkout", "env-1")],
    };
    AutoOpsRulesCache::new(backend.clone()).put(&cached, "env-1").await.unwrap();

    let lookup = AutoOpsRulesLookup::new(CountingSource::default(), backend);

    assert_eq!(lookup.list_auto_ops_rules("env-1").await.unwrap(), cached.auto_ops_rules);
    assert_eq!(lookup_calls(&lookup), 0);
}

#[tokio::test(start_paused = true)]
async fn fetched_rules_are_written_back_for_a_minute() {
    let backend = MockBackend::new();
    let lookup = AutoOpsRulesLookup::new(CountingSource::default(), backend.clone());

    lookup.list_auto_ops_rules("env-1").await.unwrap();

    let operations = backend.operations();
    assert_eq!(operations[0], CacheOp::Get("env-1:autoOpsRule".to_string()));
    assert!(matches!(
        &operations[1],
        CacheOp::Put { key, ttl, .. } if key == "env-1:autoOpsRule" && *ttl == AUTO_OPS_RULES_TTL
    ));
    assert_eq!(operations.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failures_are_shared_but_not_remembered() {
    let lookup = AutoOpsRulesLookup::new(CountingSource::failing(), InMemoryBackend::new());

    let results = join_all((0..4).map(|_| lookup.list_auto_ops_rules("env-1"))).await;
    for result in &results {
        assert!(matches!(result, Err(Error::Source(error)) if error.to_string() == "auto ops service unavailable"));
    }
    assert_eq!(lookup_calls(&lookup), 1);

    lookup.source().failing.store(false, Ordering::SeqCst);
    assert_eq!(lookup.list_auto_ops_rules("env-1").await.unwrap().len(), 2);
    assert_eq!(lookup_calls(&lookup), 2);
}

#[tokio::test(start_paused = true)]
async fn cache_read_failure_falls_back_to_source() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();

    let backend = MockBackend::new();
    backend.fail_when(|op| matches!(op, CacheOp::Get(_)));
    let lookup = AutoOpsRulesLookup::new(CountingSource::default(), backend);

    assert_eq!(lookup.list_auto_ops_rules("env-1").await.unwrap().len(), 2);
    assert_eq!(lookup_calls(&lookup), 1);
    assert_eq!(capture.count_lines_containing(&["WARN", "failed to get auto ops rules from cache", "env-1"]), 1);
}

#[tokio::test(start_paused = true)]
async fn write_back_failure_is_only_logged() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();

    let backend = MockBackend::new();
    backend.fail_when(|op| matches!(op, CacheOp::Put { .. }));
    let lookup = AutoOpsRulesLookup::new(CountingSource::default(), backend);

    assert_eq!(lookup.list_auto_ops_rules("env-1").await.unwrap().len(), 2);
    capture.assert_contains("failed to put auto ops rules into cache");
}

#[tokio::test(start_paused = true)]
async fn feature_lookups_filter_the_shared_rule_set() {
    let lookup = AutoOpsRulesLookup::new(CountingSource::default(), InMemoryBackend::new());

    let (checkout, banner, missing) = futures::join!(
        lookup.list_auto_ops_rules_for_feature("env-1", "checkout"),
        lookup.list_auto_ops_rules_for_feature("env-1", "banner"),
        lookup.list_auto_ops_rules_for_feature("env-1", "search"),
    );

    assert_eq!(checkout.unwrap(), vec![rule("rule-1", "checkout", "env-1")]);
    assert_eq!(banner.unwrap(), vec![rule("rule-2", "banner", "env-1")]);
    assert!(missing.unwrap().is_empty());
    assert_eq!(lookup_calls(&lookup), 1);
}
