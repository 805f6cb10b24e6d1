// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Refresh job metrics.

use std::time::Duration;

use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter, MeterProvider};
use opentelemetry::{InstrumentationScope, KeyValue};

const METER_NAME: &str = "bucketeer_cacher";
const VERSION: &str = "v0.1.0";
const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.47.0";

pub(crate) const HANDLED_NAME: &str = "bucketeer.cacher.handled";
pub(crate) const DURATION_NAME: &str = "bucketeer.cacher.duration";
pub(crate) const ITEMS_NAME: &str = "bucketeer.cacher.items";
pub(crate) const FANOUT_WRITES_NAME: &str = "bucketeer.cache.fanout.writes";

pub(crate) const CACHER_NAME: &str = "cacher.name";
pub(crate) const CACHER_RESULT: &str = "cacher.result";
pub(crate) const ENVIRONMENT_ID: &str = "environment.id";

const SUCCESS: &str = "success";
const FAIL: &str = "fail";

/// Creates the meter for [`CacherTelemetry`].
#[must_use]
pub fn create_meter(meter_provider: &dyn MeterProvider) -> Meter {
    meter_provider.meter_with_scope(
        InstrumentationScope::builder(METER_NAME)
            .with_version(VERSION)
            .with_schema_url(SCHEMA_URL)
            .build(),
    )
}

fn create_handled_counter(meter: &Meter) -> Counter<u64> {
    meter
        .u64_counter(HANDLED_NAME)
        .with_description("Refresh cycles handled")
        .with_unit("{cycle}")
        .build()
}

fn create_duration_histogram(meter: &Meter) -> Histogram<f64> {
    meter
        .f64_histogram(DURATION_NAME)
        .with_description("Refresh cycle duration")
        .with_unit("s")
        .build()
}

fn create_items_gauge(meter: &Meter) -> Gauge<u64> {
    meter
        .u64_gauge(ITEMS_NAME)
        .with_description("Items written in the latest refresh of an environment")
        .with_unit("{item}")
        .build()
}

fn create_fanout_counter(meter: &Meter) -> Counter<u64> {
    meter
        .u64_counter(FANOUT_WRITES_NAME)
        .with_description("Writes to individual cache instances")
        .with_unit("{write}")
        .build()
}

const fn result_str(success: bool) -> &'static str {
    if success { SUCCESS } else { FAIL }
}

/// Metrics recorder shared by refresh jobs.
///
/// The host process creates one recorder from its meter and hands it to every job at
/// construction. A recorder created without a meter records nothing.
///
/// # Examples
///
/// ```
/// use bucketeer_cacher::CacherTelemetry;
/// use opentelemetry::global;
///
/// let meter = bucketeer_cacher::create_meter(global::meter_provider().as_ref());
/// let telemetry = CacherTelemetry::new(Some(&meter));
/// # let _ = telemetry;
/// ```
#[derive(Debug, Clone, Default)]
pub struct CacherTelemetry {
    handled: Option<Counter<u64>>,
    duration: Option<Histogram<f64>>,
    items: Option<Gauge<u64>>,
    fanout_writes: Option<Counter<u64>>,
}

impl CacherTelemetry {
    /// Creates a recorder on `meter`, or a disabled one for `None`.
    #[must_use]
    pub fn new(meter: Option<&Meter>) -> Self {
        Self {
            handled: meter.map(create_handled_counter),
            duration: meter.map(create_duration_histogram),
            items: meter.map(create_items_gauge),
            fanout_writes: meter.map(create_fanout_counter),
        }
    }

    /// Creates a recorder that records nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Records the outcome and duration of one refresh cycle.
    pub(crate) fn record_cycle(&self, cacher: &'static str, success: bool, elapsed: Duration) {
        let name = KeyValue::new(CACHER_NAME, cacher);
        if let Some(counter) = &self.handled {
            counter.add(1, &[name.clone(), KeyValue::new(CACHER_RESULT, result_str(success))]);
        }
        if let Some(histogram) = &self.duration {
            histogram.record(elapsed.as_secs_f64(), &[name]);
        }
    }

    /// Records how many items were cached for `environment_id`.
    pub(crate) fn record_items(&self, cacher: &'static str, environment_id: &str, count: usize) {
        if let Some(gauge) = &self.items {
            gauge.record(
                u64::try_from(count).unwrap_or(u64::MAX),
                &[
                    KeyValue::new(CACHER_NAME, cacher),
                    KeyValue::new(ENVIRONMENT_ID, environment_id.to_string()),
                ],
            );
        }
    }

    /// Records the per-instance outcome of one fan-out write.
    pub(crate) fn record_fanout(&self, cacher: &'static str, succeeded: usize, failed: usize) {
        let Some(counter) = &self.fanout_writes else {
            return;
        };
        for (count, success) in [(succeeded, true), (failed, false)] {
            if count > 0 {
                counter.add(
                    u64::try_from(count).unwrap_or(u64::MAX),
                    &[
                        KeyValue::new(CACHER_NAME, cacher),
                        KeyValue::new(CACHER_RESULT, result_str(success)),
                    ],
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use testing_aids::MetricTester;

    use super::*;

    #[test]
    fn cycle_outcome_and_duration() {
        let tester = MetricTester::new();
        let telemetry = CacherTelemetry::new(Some(&create_meter(tester.meter_provider())));

        telemetry.record_cycle("feature_flag", true, Duration::from_millis(20));
        telemetry.record_cycle("feature_flag", false, Duration::from_millis(5));

        let name = KeyValue::new(CACHER_NAME, "feature_flag");
        assert_eq!(
            tester.counter_total(HANDLED_NAME, &[name.clone(), KeyValue::new(CACHER_RESULT, "success")]),
            1
        );
        assert_eq!(tester.counter_total(HANDLED_NAME, &[KeyValue::new(CACHER_RESULT, "fail")]), 1);
        assert_eq!(tester.histogram_count(DURATION_NAME, &[name]), 2);
    }

    #[test]
    fn items_are_tracked_per_environment() {
        let tester = MetricTester::new();
        let telemetry = CacherTelemetry::new(Some(&create_meter(tester.meter_provider())));

        telemetry.record_items("segment_user", "env-1", 3);
        telemetry.record_items("segment_user", "env-2", 7);

        assert_eq!(tester.gauge_value(ITEMS_NAME, &[KeyValue::new(ENVIRONMENT_ID, "env-1")]), Some(3));
        assert_eq!(tester.gauge_value(ITEMS_NAME, &[KeyValue::new(ENVIRONMENT_ID, "env-2")]), Some(7));
    }

    #[test]
    fn fanout_counts_each_instance() {
        let tester = MetricTester::new();
        let telemetry = CacherTelemetry::new(Some(&create_meter(tester.meter_provider())));

        telemetry.record_fanout("api_key", 2, 1);

        assert_eq!(tester.counter_total(FANOUT_WRITES_NAME, &[KeyValue::new(CACHER_RESULT, "success")]), 2);
        assert_eq!(tester.counter_total(FANOUT_WRITES_NAME, &[KeyValue::new(CACHER_RESULT, "fail")]), 1);
    }

    #[test]
    fn disabled_recorder_is_inert() {
        let telemetry = CacherTelemetry::disabled();
        telemetry.record_cycle("x", true, Duration::ZERO);
        telemetry.record_items("x", "env", 1);
        telemetry.record_fanout("x", 1, 1);
    }
}
