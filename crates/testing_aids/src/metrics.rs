// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Meter, MeterProvider};
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, Metric, MetricData, ResourceMetrics};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, SdkMeterProvider};

/// Collects OpenTelemetry metrics in memory and reads them back by name.
///
/// Every query flushes the provider first, so values reflect everything recorded before
/// the call. Counters are cumulative, which means the latest export holds the totals.
#[derive(Debug)]
pub struct MetricTester {
    exporter: InMemoryMetricExporter,
    provider: SdkMeterProvider,
}

impl Default for MetricTester {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricTester {
    #[must_use]
    pub fn new() -> Self {
        let exporter = InMemoryMetricExporter::default();
        let provider = SdkMeterProvider::builder().with_periodic_exporter(exporter.clone()).build();
        Self { exporter, provider }
    }

    #[must_use]
    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.provider
    }

    /// Returns a meter from the underlying provider.
    #[must_use]
    pub fn meter(&self) -> Meter {
        self.provider.meter("testing_aids")
    }

    fn latest(&self) -> Option<ResourceMetrics> {
        self.provider.force_flush().unwrap();
        self.exporter.get_finished_metrics().unwrap().pop()
    }

    fn with_metric<R>(&self, name: &str, f: impl FnOnce(&Metric) -> R) -> Option<R> {
        let latest = self.latest()?;
        latest
            .scope_metrics()
            .flat_map(opentelemetry_sdk::metrics::data::ScopeMetrics::metrics)
            .find(|metric| metric.name() == name)
            .map(f)
    }

    /// Returns the names of every exported instrument.
    #[must_use]
    pub fn metric_names(&self) -> Vec<String> {
        self.latest()
            .map(|latest| {
                latest
                    .scope_metrics()
                    .flat_map(opentelemetry_sdk::metrics::data::ScopeMetrics::metrics)
                    .map(|metric| metric.name().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the attributes of every data point of every exported instrument.
    #[must_use]
    pub fn collect_attributes(&self) -> Vec<KeyValue> {
        self.latest()
            .map(|latest| {
                latest
                    .scope_metrics()
                    .flat_map(opentelemetry_sdk::metrics::data::ScopeMetrics::metrics)
                    .flat_map(attributes_of)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// # Panics
    ///
    /// Panics if any of `key_values` is missing from the exported attributes.
    pub fn assert_attributes_contain(&self, key_values: &[KeyValue]) {
        let attributes = self.collect_attributes();
        for attr in key_values {
            assert!(
                attributes.contains(attr),
                "attribute {attr:?} not found in collected attributes: {attributes:?}"
            );
        }
    }

    /// Returns the total of the `u64` counter `name` over data points carrying all of
    /// `attributes`.
    #[must_use]
    pub fn counter_total(&self, name: &str, attributes: &[KeyValue]) -> u64 {
        self.with_metric(name, |metric| match metric.data() {
            AggregatedMetrics::U64(MetricData::Sum(sum)) => sum
                .data_points()
                .filter(|point| has_all(point.attributes(), attributes))
                .map(opentelemetry_sdk::metrics::data::SumDataPoint::value)
                .sum(),
            _ => 0,
        })
        .unwrap_or(0)
    }

    /// Returns the number of samples in the `f64` histogram `name` over data points carrying
    /// all of `attributes`.
    #[must_use]
    pub fn histogram_count(&self, name: &str, attributes: &[KeyValue]) -> u64 {
        self.with_metric(name, |metric| match metric.data() {
            AggregatedMetrics::F64(MetricData::Histogram(histogram)) => histogram
                .data_points()
                .filter(|point| has_all(point.attributes(), attributes))
                .map(opentelemetry_sdk::metrics::data::HistogramDataPoint::count)
                .sum(),
            _ => 0,
        })
        .unwrap_or(0)
    }

    /// Returns the last value of the `u64` gauge `name` for the data point carrying all of
    /// `attributes`.
    #[must_use]
    pub fn gauge_value(&self, name: &str, attributes: &[KeyValue]) -> Option<u64> {
        self.with_metric(name, |metric| match metric.data() {
            AggregatedMetrics::U64(MetricData::Gauge(gauge)) => gauge
                .data_points()
                .find(|point| has_all(point.attributes(), attributes))
                .map(opentelemetry_sdk::metrics::data::GaugeDataPoint::value),
            _ => None,
        })
        .flatten()
    }
}

fn has_all<'a>(point: impl Iterator<Item = &'a KeyValue>, expected: &[KeyValue]) -> bool {
    let point: Vec<&KeyValue> = point.collect();
    expected.iter().all(|kv| point.contains(&kv))
}

fn attributes_of(metric: &Metric) -> Vec<KeyValue> {
    macro_rules! points {
        ($data:expr) => {
            match $data {
                MetricData::Gauge(data) => data.data_points().flat_map(|p| p.attributes().cloned()).collect(),
                MetricData::Sum(data) => data.data_points().flat_map(|p| p.attributes().cloned()).collect(),
                MetricData::Histogram(data) => data.data_points().flat_map(|p| p.attributes().cloned()).collect(),
                MetricData::ExponentialHistogram(data) => data.data_points().flat_map(|p| p.attributes().cloned()).collect(),
            }
        };
    }

    match metric.data() {
        AggregatedMetrics::F64(data) => points!(data),
        AggregatedMetrics::U64(data) => points!(data),
        AggregatedMetrics::I64(data) => points!(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_back_counter_histogram_and_gauge() {
        let tester = MetricTester::new();
        let meter = tester.meter();

        let counter = meter.u64_counter("test.count").build();
        counter.add(2, &[KeyValue::new("result", "success")]);
        counter.add(1, &[KeyValue::new("result", "fail")]);

        let histogram = meter.f64_histogram("test.duration").build();
        histogram.record(0.5, &[]);

        let gauge = meter.u64_gauge("test.items").build();
        gauge.record(7, &[KeyValue::new("env", "env-1")]);

        assert_eq!(tester.counter_total("test.count", &[]), 3);
        assert_eq!(tester.counter_total("test.count", &[KeyValue::new("result", "success")]), 2);
        assert_eq!(tester.histogram_count("test.duration", &[]), 1);
        assert_eq!(tester.gauge_value("test.items", &[KeyValue::new("env", "env-1")]), Some(7));
        assert!(tester.metric_names().contains(&"test.count".to_string()));
        tester.assert_attributes_contain(&[KeyValue::new("env", "env-1")]);
    }
}
