//! The collection core of OpenTelemetry metrics.
//!
//! ## Configuration
//!
//! Configuration is stored with each [SdkMeterProvider]: the [Resource]
//! attached to every stream, the [View]s applied to instruments and the
//! [MetricReader]s that collect them.
//!
//! ### Example
//!
//! ```
//! use opentelemetry::KeyValue;
//! use opentelemetry_metrics_core::metrics::{ManualReader, SdkMeterProvider, Temporality};
//! use opentelemetry_metrics_core::Resource;
//!
//! # futures_executor::block_on(async {
//! // default attributes about the current process
//! let resource = Resource::builder().build();
//!
//! let delta = ManualReader::builder()
//!     .with_temporality(Temporality::Delta)
//!     .build();
//! let meter_provider = SdkMeterProvider::builder()
//!     .with_resource(resource)
//!     .with_reader(delta.clone())
//!     .build();
//!
//! // Create instruments scoped to a meter
//! let counter = meter_provider
//!     .meter("my_app")
//!     .f64_counter("power_consumption")
//!     .with_unit("kWh")
//!     .build();
//!
//! // use instruments to record measurements
//! counter.add(10.0, &[KeyValue::new("rate", "standard")]);
//!
//! let metrics = delta.collect().await.unwrap();
//! assert_eq!(metrics[0].name(), "power_consumption");
//!
//! // shutdown the provider at the end of the application.
//! meter_provider.shutdown().await.unwrap();
//! # });
//! ```
//!
//! [Resource]: crate::Resource

pub(crate) mod aggregation;
pub(crate) mod attribute_set;
pub(crate) mod collector;
pub mod data;
mod error;
pub(crate) mod instrument;
pub(crate) mod internal;
pub(crate) mod manual_reader;
pub(crate) mod meter;
mod meter_provider;
pub mod reader;
pub(crate) mod state;
pub(crate) mod storage;
pub(crate) mod view;

pub use aggregation::Aggregation;
pub use collector::{CollectorState, MetricCollector};
pub use error::{MetricError, MetricResult};
pub use instrument::{
    create_instrument_descriptor, AsyncInstrumentBuilder, Callback, CallbackError, Counter,
    Histogram, HistogramBuilder, InstrumentBuilder, InstrumentDescriptor, InstrumentKind,
    InstrumentOptions, ObservableCounter, ObservableGauge, ObservableUpDownCounter, Observer,
    UpDownCounter, ValueType,
};
pub use manual_reader::{ManualReader, ManualReaderBuilder};
pub use meter::Meter;
pub use meter_provider::{MeterProviderBuilder, SdkMeterProvider};
pub use reader::MetricReader;
pub use view::{apply_view, View, ViewBuilder};

/// Defines the window that an aggregation was calculated over.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Temporality {
    /// A measurement interval that continues to expand forward in time from a
    /// starting point.
    ///
    /// New measurements are added to all previous measurements since a start time.
    #[default]
    Cumulative,

    /// A measurement interval that resets each cycle.
    ///
    /// Measurements from one cycle are recorded independently, measurements from
    /// other cycles do not affect them.
    Delta,
}

#[cfg(test)]
mod tests {
    use super::data::{AggregatedMetrics, MetricData, MetricPoints};
    use super::*;
    use opentelemetry::KeyValue;
    use std::thread;

    fn setup(temporality: Temporality) -> (SdkMeterProvider, ManualReader) {
        let reader = ManualReader::builder().with_temporality(temporality).build();
        let provider = SdkMeterProvider::builder()
            .with_reader(reader.clone())
            .build();
        (provider, reader)
    }

    fn single(metrics: &[MetricData], name: &str) -> AggregatedMetrics {
        let matching: Vec<&MetricData> = metrics.iter().filter(|m| m.name() == name).collect();
        assert_eq!(matching.len(), 1, "expected exactly one stream named {name}");
        matching[0].data.clone()
    }

    #[tokio::test]
    async fn counter_aggregation_multithreaded() {
        let (provider, reader) = setup(Temporality::Cumulative);
        let counter = provider.meter("test").f64_counter("my_counter").build();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        counter.add(1.5, &[KeyValue::new("key1", "value1")]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let metrics = reader.collect().await.unwrap();
        match single(&metrics, "my_counter") {
            AggregatedMetrics::F64(MetricPoints::Sum(sum)) => {
                assert!(sum.is_monotonic);
                assert_eq!(sum.temporality, Temporality::Cumulative);
                assert_eq!(sum.data_points.len(), 1);
                assert_eq!(sum.data_points[0].value, 600.0);
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[tokio::test]
    async fn counter_attribute_order_does_not_matter() {
        let (provider, reader) = setup(Temporality::Cumulative);
        let counter = provider.meter("test").i64_counter("my_counter").build();
        counter.add(1, &[KeyValue::new("a", 1_i64), KeyValue::new("b", "x")]);
        counter.add(1, &[KeyValue::new("b", "x"), KeyValue::new("a", 1_i64)]);

        let metrics = reader.collect().await.unwrap();
        match single(&metrics, "my_counter") {
            AggregatedMetrics::I64(MetricPoints::Sum(sum)) => {
                assert_eq!(sum.data_points.len(), 1);
                assert_eq!(sum.data_points[0].value, 2);
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[tokio::test]
    async fn up_down_counter_is_not_monotonic() {
        let (provider, reader) = setup(Temporality::Delta);
        let counter = provider.meter("test").i64_up_down_counter("queue").build();
        counter.add(10, &[]);
        counter.add(-4, &[]);

        let metrics = reader.collect().await.unwrap();
        match single(&metrics, "queue") {
            AggregatedMetrics::I64(MetricPoints::Sum(sum)) => {
                assert!(!sum.is_monotonic);
                assert_eq!(sum.temporality, Temporality::Delta);
                assert_eq!(sum.data_points[0].value, 6);
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[tokio::test]
    async fn histogram_delta_and_cumulative() {
        for temporality in [Temporality::Delta, Temporality::Cumulative] {
            let (provider, reader) = setup(temporality);
            let histogram = provider
                .meter("test")
                .f64_histogram("latency")
                .with_boundaries(vec![10.0, 100.0])
                .build();
            histogram.record(5.0, &[]);
            histogram.record(50.0, &[]);
            histogram.record(500.0, &[]);

            let metrics = reader.collect().await.unwrap();
            match single(&metrics, "latency") {
                AggregatedMetrics::F64(MetricPoints::Histogram(h)) => {
                    let dp = &h.data_points[0];
                    assert_eq!(dp.count, 3);
                    assert_eq!(dp.bucket_counts, vec![1, 1, 1]);
                    assert_eq!(dp.min, Some(5.0));
                    assert_eq!(dp.max, Some(500.0));
                    assert_eq!(dp.sum, 555.0);
                }
                other => panic!("unexpected data {other:?}"),
            }

            let again = reader.collect().await.unwrap();
            match temporality {
                Temporality::Delta => assert!(again.is_empty()),
                Temporality::Cumulative => assert_eq!(again.len(), 1),
            }
        }
    }

    #[tokio::test]
    async fn observable_counter_delta_is_derived() {
        let (provider, reader) = setup(Temporality::Delta);
        let total = std::sync::Arc::new(std::sync::atomic::AtomicI64::new(0));
        let source = total.clone();
        provider
            .meter("test")
            .i64_observable_counter("bytes")
            .with_callback(move |observer| {
                observer.observe(source.load(std::sync::atomic::Ordering::Relaxed), &[])
            })
            .build();

        let mut seen = vec![];
        for step in [100, 250, 250] {
            total.store(step, std::sync::atomic::Ordering::Relaxed);
            let metrics = reader.collect().await.unwrap();
            match single(&metrics, "bytes") {
                AggregatedMetrics::I64(MetricPoints::Sum(sum)) => {
                    seen.push(sum.data_points[0].value)
                }
                other => panic!("unexpected data {other:?}"),
            }
        }
        assert_eq!(seen, vec![100, 150, 0]);
    }

    #[tokio::test]
    async fn observable_gauge_reports_last_value() {
        let (provider, reader) = setup(Temporality::Cumulative);
        provider
            .meter("test")
            .f64_observable_gauge("temperature")
            .with_callback(|observer| {
                observer.observe(20.0, &[KeyValue::new("room", "a")]);
                observer.observe(21.5, &[KeyValue::new("room", "a")]);
            })
            .build();

        let metrics = reader.collect().await.unwrap();
        match single(&metrics, "temperature") {
            AggregatedMetrics::F64(MetricPoints::Gauge(gauge)) => {
                assert_eq!(gauge.data_points.len(), 1);
                assert_eq!(gauge.data_points[0].value, 21.5);
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[tokio::test]
    async fn meters_are_exported_in_creation_order() {
        let (provider, reader) = setup(Temporality::Cumulative);
        for name in ["zeta", "alpha", "mid"] {
            provider.meter(name).i64_counter("c").build().add(1, &[]);
        }

        let metrics = reader.collect().await.unwrap();
        let scopes: Vec<&str> = metrics.iter().map(|m| m.scope.name()).collect();
        assert_eq!(scopes, vec!["zeta", "alpha", "mid"]);
        assert!(metrics.iter().all(|m| m.temporality == Temporality::Cumulative));
    }
}
