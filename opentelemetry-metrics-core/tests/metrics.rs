use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;

use async_trait::async_trait;
use opentelemetry::KeyValue;
use opentelemetry_metrics_core::metrics::data::{AggregatedMetrics, MetricData, MetricPoints};
use opentelemetry_metrics_core::metrics::{
    apply_view, create_instrument_descriptor, CollectorState, InstrumentKind, InstrumentOptions,
    ManualReader, MetricCollector, MetricError, MetricReader, MetricResult, SdkMeterProvider,
    Temporality, ValueType, View,
};
use opentelemetry_metrics_core::Resource;
use tokio::sync::Notify;

fn reader(temporality: Temporality) -> ManualReader {
    ManualReader::builder().with_temporality(temporality).build()
}

fn i64_sum(metrics: &[MetricData], name: &str) -> Option<i64> {
    metrics
        .iter()
        .find(|m| m.name() == name)
        .map(|m| match &m.data {
            AggregatedMetrics::I64(MetricPoints::Sum(sum)) => {
                sum.data_points.iter().map(|dp| dp.value).sum()
            }
            other => panic!("unexpected data {other:?}"),
        })
}

#[tokio::test]
async fn cumulative_and_delta_readers_see_their_own_windows() {
    let cumulative = reader(Temporality::Cumulative);
    let delta = reader(Temporality::Delta);
    let provider = SdkMeterProvider::builder()
        .with_reader(cumulative.clone())
        .with_reader(delta.clone())
        .build();

    let counter = provider.meter("app").i64_counter("requests").build();
    counter.add(5, &[]);
    counter.add(3, &[]);

    assert_eq!(i64_sum(&cumulative.collect().await.unwrap(), "requests"), Some(8));
    assert_eq!(i64_sum(&delta.collect().await.unwrap(), "requests"), Some(8));
    assert_eq!(i64_sum(&cumulative.collect().await.unwrap(), "requests"), Some(8));
    // known series are reported with a zero value
    assert_eq!(i64_sum(&delta.collect().await.unwrap(), "requests"), Some(0));

    counter.add(2, &[]);
    assert_eq!(i64_sum(&delta.collect().await.unwrap(), "requests"), Some(2));
    assert_eq!(i64_sum(&cumulative.collect().await.unwrap(), "requests"), Some(10));

    let metrics = delta.collect().await.unwrap();
    assert!(metrics.iter().all(|m| m.temporality == Temporality::Delta));
}

#[tokio::test]
async fn concurrent_recording_is_not_lost() {
    let cumulative = reader(Temporality::Cumulative);
    let delta = reader(Temporality::Delta);
    let provider = SdkMeterProvider::builder()
        .with_reader(cumulative.clone())
        .with_reader(delta.clone())
        .build();
    let counter = provider.meter("app").i64_counter("requests").build();

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..1_000 {
                    counter.add(1, &[KeyValue::new("worker", i64::from(i % 2))]);
                }
            })
        })
        .collect();

    let mut delta_total = 0;
    for _ in 0..5 {
        delta_total += i64_sum(&delta.collect().await.unwrap(), "requests").unwrap_or(0);
    }
    for worker in workers {
        worker.join().unwrap();
    }
    delta_total += i64_sum(&delta.collect().await.unwrap(), "requests").unwrap_or(0);

    assert_eq!(delta_total, 4_000);
    assert_eq!(
        i64_sum(&cumulative.collect().await.unwrap(), "requests"),
        Some(4_000)
    );
}

#[tokio::test]
async fn late_reader_sees_no_backfill() {
    let early = reader(Temporality::Cumulative);
    let provider = SdkMeterProvider::builder()
        .with_reader(early.clone())
        .build();
    let counter = provider.meter("app").i64_counter("requests").build();
    counter.add(10, &[]);

    let late = reader(Temporality::Cumulative);
    let collector = provider.register_reader(late.clone()).unwrap();
    assert_eq!(collector.temporality(), Temporality::Cumulative);
    assert!(late.collect().await.unwrap().is_empty());

    counter.add(1, &[]);
    assert_eq!(i64_sum(&late.collect().await.unwrap(), "requests"), Some(1));
    assert_eq!(i64_sum(&early.collect().await.unwrap(), "requests"), Some(11));
}

#[tokio::test]
async fn collect_after_shutdown_fails() {
    let manual = reader(Temporality::Cumulative);
    let provider = SdkMeterProvider::builder().build();
    let collector = provider.register_reader(manual.clone()).unwrap();
    provider
        .meter("app")
        .i64_counter("requests")
        .build()
        .add(1, &[]);

    collector.shutdown().await.unwrap();
    assert_eq!(collector.state(), CollectorState::Shutdown);
    assert!(matches!(
        collector.collect().await,
        Err(MetricError::AlreadyShutdown)
    ));
    assert!(matches!(
        collector.force_flush().await,
        Err(MetricError::AlreadyShutdown)
    ));
    assert!(matches!(
        collector.shutdown().await,
        Err(MetricError::AlreadyShutdown)
    ));
    assert!(manual.collect().await.is_err());
}

#[tokio::test]
async fn one_collector_shutting_down_leaves_others_running() {
    let first = reader(Temporality::Cumulative);
    let second = reader(Temporality::Cumulative);
    let provider = SdkMeterProvider::builder().build();
    let first_collector = provider.register_reader(first.clone()).unwrap();
    let _second_collector = provider.register_reader(second.clone()).unwrap();
    let counter = provider.meter("app").i64_counter("requests").build();
    counter.add(4, &[]);

    first_collector.shutdown().await.unwrap();
    counter.add(1, &[]);

    assert!(first.collect().await.is_err());
    assert_eq!(i64_sum(&second.collect().await.unwrap(), "requests"), Some(5));
}

/// Blocks in `shutdown` until released.
#[derive(Debug, Clone, Default)]
struct GatedReader {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl MetricReader for GatedReader {
    fn register_collector(&self, _collector: Weak<MetricCollector>) {}

    fn temporality(&self) -> Temporality {
        Temporality::Cumulative
    }

    async fn force_flush(&self) -> MetricResult<()> {
        Ok(())
    }

    async fn shutdown(&self) -> MetricResult<()> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn calls_fail_while_shutting_down() {
    let gated = GatedReader::default();
    let provider = SdkMeterProvider::builder().build();
    let collector = provider.register_reader(gated.clone()).unwrap();
    assert_eq!(collector.state(), CollectorState::Active);

    let shutting_down = {
        let collector = Arc::clone(&collector);
        tokio::spawn(async move { collector.shutdown().await })
    };
    gated.entered.notified().await;

    assert_eq!(collector.state(), CollectorState::ShuttingDown);
    assert!(matches!(
        collector.collect().await,
        Err(MetricError::AlreadyShutdown)
    ));
    assert!(matches!(
        collector.force_flush().await,
        Err(MetricError::AlreadyShutdown)
    ));
    assert!(matches!(
        collector.shutdown().await,
        Err(MetricError::AlreadyShutdown)
    ));

    gated.release.notify_one();
    shutting_down.await.unwrap().unwrap();
    assert_eq!(collector.state(), CollectorState::Shutdown);
}

#[tokio::test]
async fn two_views_export_one_instrument_twice() {
    let view = |name: &'static str| {
        View::builder()
            .with_instrument_name("http.duration")
            .with_name(name)
            .build()
            .unwrap()
    };
    let manual = reader(Temporality::Cumulative);
    let provider = SdkMeterProvider::builder()
        .with_reader(manual.clone())
        .with_view(view("http_duration_a"))
        .with_view(view("http_duration_b"))
        .build();

    provider
        .meter("http")
        .f64_histogram("http.duration")
        .with_unit("ms")
        .build()
        .record(42.0, &[KeyValue::new("route", "/")]);

    let metrics = manual.collect().await.unwrap();
    let names: Vec<&str> = metrics.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["http_duration_a", "http_duration_b"]);
    for metric in &metrics {
        assert_eq!(metric.descriptor.unit, "ms");
        match &metric.data {
            AggregatedMetrics::F64(MetricPoints::Histogram(histogram)) => {
                assert_eq!(histogram.data_points.len(), 1);
                assert_eq!(histogram.data_points[0].count, 1);
                assert_eq!(histogram.data_points[0].sum, 42.0);
            }
            other => panic!("unexpected data {other:?}"),
        }
    }
}

#[tokio::test]
async fn failing_callback_does_not_affect_other_instruments() {
    let manual = reader(Temporality::Cumulative);
    let provider = SdkMeterProvider::builder()
        .with_reader(manual.clone())
        .build();
    let meter = provider.meter("app");

    meter
        .i64_observable_up_down_counter("connections")
        .with_fallible_callback(|_| Err("pool unavailable".into()))
        .build();
    meter
        .f64_observable_gauge("cpu")
        .with_callback(|observer| observer.observe(0.5, &[]))
        .build();
    meter.i64_counter("requests").build().add(3, &[]);

    let metrics = manual.collect().await.unwrap();
    let names: Vec<&str> = metrics.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["cpu", "requests"]);
    assert_eq!(i64_sum(&metrics, "requests"), Some(3));
}

#[tokio::test]
async fn callbacks_only_feed_the_collecting_reader() {
    let first = reader(Temporality::Cumulative);
    let second = reader(Temporality::Cumulative);
    let provider = SdkMeterProvider::builder()
        .with_reader(first.clone())
        .with_reader(second.clone())
        .build();
    provider
        .meter("app")
        .i64_observable_counter("bytes")
        .with_callback(|observer| observer.observe(7, &[]))
        .build();

    assert_eq!(i64_sum(&first.collect().await.unwrap(), "bytes"), Some(7));
    assert_eq!(i64_sum(&first.collect().await.unwrap(), "bytes"), Some(7));
    assert_eq!(i64_sum(&second.collect().await.unwrap(), "bytes"), Some(7));
}

#[tokio::test]
async fn delta_observable_skips_failed_pass_without_double_counting() {
    let delta = reader(Temporality::Delta);
    let provider = SdkMeterProvider::builder()
        .with_reader(delta.clone())
        .build();

    let pass = Arc::new(AtomicUsize::new(0));
    let source = Arc::clone(&pass);
    provider
        .meter("app")
        .i64_observable_counter("bytes")
        .with_fallible_callback(move |observer| match source.fetch_add(1, Ordering::Relaxed) {
            0 => {
                observer.observe(10, &[]);
                Ok(())
            }
            1 => Err("source unavailable".into()),
            _ => {
                observer.observe(25, &[]);
                Ok(())
            }
        })
        .build();

    assert_eq!(i64_sum(&delta.collect().await.unwrap(), "bytes"), Some(10));
    assert_eq!(i64_sum(&delta.collect().await.unwrap(), "bytes"), None);
    assert_eq!(i64_sum(&delta.collect().await.unwrap(), "bytes"), Some(15));
}

#[tokio::test]
async fn data_carries_resource_and_scope() {
    let manual = reader(Temporality::Cumulative);
    let resource = Resource::builder_empty().with_service_name("checkout").build();
    let provider = SdkMeterProvider::builder()
        .with_resource(resource.clone())
        .with_reader(manual.clone())
        .build();
    provider
        .meter("checkout-lib")
        .i64_up_down_counter("carts")
        .build()
        .add(-1, &[]);

    let metrics = manual.collect().await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].resource, resource);
    assert_eq!(metrics[0].scope.name(), "checkout-lib");
    assert_eq!(i64_sum(&metrics, "carts"), Some(-1));
}

#[test]
fn apply_view_is_idempotent() {
    let instrument = create_instrument_descriptor(
        "http.duration",
        InstrumentKind::Histogram,
        InstrumentOptions {
            value_type: Some(ValueType::Double),
            ..Default::default()
        },
    );
    let view = View::builder()
        .with_instrument_name("http.duration")
        .with_name("latency")
        .with_description("request latency")
        .build()
        .unwrap();

    let once = apply_view(&view, &instrument);
    assert_eq!(once.name, "latency");
    assert_eq!(once.unit, "1");
    assert_eq!(apply_view(&view, &once), once);
}
