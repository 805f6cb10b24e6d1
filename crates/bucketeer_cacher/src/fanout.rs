// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use futures::future::join_all;

use crate::CacherTelemetry;

/// Writes one payload to every cache instance, each independently.
///
/// A failing instance is logged and counted but never fails the write as a whole, and
/// never keeps the other instances from being written. All writes are polled
/// concurrently inside the caller's future and have finished when [`put`](Self::put)
/// returns. Dropping that future cancels every write still pending.
///
/// # Examples
///
/// ```
/// use bucketeer_cache::FeaturesCache;
/// use bucketeer_cache_memory::InMemoryBackend;
/// use bucketeer_cacher::{CacherTelemetry, FanOut};
/// use bucketeer_proto::feature::Features;
///
/// # futures::executor::block_on(async {
/// let fan_out = FanOut::new(
///     vec![FeaturesCache::new(InMemoryBackend::new()), FeaturesCache::new(InMemoryBackend::new())],
///     "feature_flag",
///     CacherTelemetry::disabled(),
/// );
///
/// let features = Features::default();
/// let written = fan_out.put("env-1", |cache| cache.put(&features, "env-1")).await;
/// assert_eq!(written, 2);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct FanOut<W> {
    instances: Vec<W>,
    cacher: &'static str,
    telemetry: CacherTelemetry,
}

impl<W> FanOut<W> {
    /// Creates a writer over `instances`, reporting as `cacher` in logs and metrics.
    #[must_use]
    pub fn new(instances: Vec<W>, cacher: &'static str, telemetry: CacherTelemetry) -> Self {
        Self {
            instances,
            cacher,
            telemetry,
        }
    }

    /// Returns the cache instances.
    #[must_use]
    pub fn instances(&self) -> &[W] {
        &self.instances
    }

    /// Returns the number of cache instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` when there is no instance to write to.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Runs `write` against every instance and returns how many succeeded.
    ///
    /// `subject` names what is being written, usually an environment or segment, and
    /// only appears in the failure log.
    pub async fn put<'a, F, Fut>(&'a self, subject: &str, write: F) -> usize
    where
        F: Fn(&'a W) -> Fut,
        Fut: Future<Output = bucketeer_cache_tier::Result<()>>,
    {
        let results = join_all(self.instances.iter().map(&write)).await;

        let mut succeeded = 0;
        for (instance, result) in results.iter().enumerate() {
            match result {
                Ok(()) => succeeded += 1,
                Err(error) => {
                    tracing::error!(cacher = self.cacher, instance, subject, error = %error, "failed to put cache");
                }
            }
        }

        self.telemetry.record_fanout(self.cacher, succeeded, results.len() - succeeded);
        succeeded
    }
}

#[cfg(test)]
mod tests {
    use bucketeer_cache::FeaturesCache;
    use bucketeer_cache_tier::testing::{CacheOp, MockBackend};
    use bucketeer_proto::feature::{Feature, Features};
    use opentelemetry::KeyValue;
    use testing_aids::{LogCapture, MetricTester};

    use super::*;
    use crate::telemetry::{CACHER_RESULT, FANOUT_WRITES_NAME};

    fn features() -> Features {
        Features {
            features: vec![Feature {
                id: "checkout".to_string(),
                ..Feature::default()
            }],
            id: "1".to_string(),
        }
    }

    #[test]
    fn failed_instance_is_counted_out() {
        let broken = MockBackend::new();
        broken.fail_when(|op| matches!(op, CacheOp::Put { .. }));
        let healthy = MockBackend::new();
        let fan_out = FanOut::new(
            vec![FeaturesCache::new(broken.clone()), FeaturesCache::new(healthy.clone())],
            "feature_flag",
            CacherTelemetry::disabled(),
        );

        let features = features();
        let written = futures::executor::block_on(fan_out.put("env-1", |cache| cache.put(&features, "env-1")));

        assert_eq!(written, 1);
        assert!(healthy.contains_key("env-1:features"));
        assert!(!broken.contains_key("env-1:features"));
    }

    #[test]
    fn every_instance_is_attempted() {
        let backends: Vec<_> = (0..3).map(|_| MockBackend::new()).collect();
        for backend in &backends {
            backend.fail_when(|_| true);
        }
        let fan_out = FanOut::new(
            backends.iter().cloned().map(FeaturesCache::new).collect(),
            "feature_flag",
            CacherTelemetry::disabled(),
        );

        let features = features();
        let written = futures::executor::block_on(fan_out.put("env-1", |cache| cache.put(&features, "env-1")));

        assert_eq!(written, 0);
        for backend in &backends {
            assert_eq!(backend.operations().len(), 1);
        }
    }

    #[test]
    fn failures_are_logged_with_instance() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();

        let broken = MockBackend::new();
        broken.fail_when(|_| true);
        let fan_out = FanOut::new(
            vec![FeaturesCache::new(MockBackend::new()), FeaturesCache::new(broken)],
            "feature_flag",
            CacherTelemetry::disabled(),
        );

        let features = features();
        futures::executor::block_on(fan_out.put("env-7", |cache| cache.put(&features, "env-7")));

        assert_eq!(capture.count_lines_containing(&["failed to put cache", "instance=1", "env-7"]), 1);
        capture.assert_contains("injected failure");
    }

    #[test]
    fn writes_are_metered_per_instance() {
        let tester = MetricTester::new();
        let telemetry = CacherTelemetry::new(Some(&crate::create_meter(tester.meter_provider())));

        let broken = MockBackend::new();
        broken.fail_when(|_| true);
        let fan_out = FanOut::new(
            vec![
                FeaturesCache::new(MockBackend::new()),
                FeaturesCache::new(MockBackend::new()),
                FeaturesCache::new(broken),
            ],
            "feature_flag",
            telemetry,
        );

        let features = features();
        futures::executor::block_on(fan_out.put("env-1", |cache| cache.put(&features, "env-1")));

        assert_eq!(tester.counter_total(FANOUT_WRITES_NAME, &[KeyValue::new(CACHER_RESULT, "success")]), 2);
        assert_eq!(tester.counter_total(FANOUT_WRITES_NAME, &[KeyValue::new(CACHER_RESULT, "fail")]), 1);
    }

    #[test]
    fn no_instances_writes_nothing() {
        let fan_out: FanOut<FeaturesCache<MockBackend>> = FanOut::new(Vec::new(), "feature_flag", CacherTelemetry::disabled());
        assert!(fan_out.is_empty());

        let features = features();
        assert_eq!(futures::executor::block_on(fan_out.put("env-1", |cache| cache.put(&features, "env-1"))), 0);
    }
}
