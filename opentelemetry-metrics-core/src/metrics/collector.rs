use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use futures_util::future::try_join_all;

use super::data::MetricData;
use super::error::{MetricError, MetricResult};
use super::reader::MetricReader;
use super::state::MeterProviderSharedState;
use super::Temporality;

/// Identifies the partition a collector owns in every stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CollectorHandle {
    pub(crate) id: usize,
    pub(crate) temporality: Temporality,
}

impl CollectorHandle {
    pub(crate) fn new(id: usize, temporality: Temporality) -> Self {
        CollectorHandle { id, temporality }
    }
}

/// The lifecycle of a [`MetricCollector`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectorState {
    /// Collections and flushes are served.
    Active,
    /// `shutdown` has been called and the reader is shutting down. Collections
    /// already in flight complete, new ones fail.
    ShuttingDown,
    /// Terminal, every call fails.
    Shutdown,
}

const ACTIVE: u8 = 0;
const SHUTTING_DOWN: u8 = 1;
const SHUTDOWN: u8 = 2;

/// The per-reader view of a provider.
///
/// A collector is created for every reader registered with a
/// [`SdkMeterProvider`](super::SdkMeterProvider). It fixes the reader's
/// [`Temporality`] and owns one partition in every stream of every meter, so
/// readers never observe each other's resets.
pub struct MetricCollector {
    handle: CollectorHandle,
    shared: Arc<MeterProviderSharedState>,
    reader: Box<dyn MetricReader>,
    state: AtomicU8,
}

impl MetricCollector {
    /// Registers `reader` with the shared state and hands it its collector.
    pub(crate) fn register(
        shared: Arc<MeterProviderSharedState>,
        reader: Box<dyn MetricReader>,
    ) -> MetricResult<Arc<MetricCollector>> {
        let temporality = reader.temporality();
        let handle = shared.register_collector(temporality)?;

        let collector = Arc::new(MetricCollector {
            handle,
            shared,
            reader,
            state: AtomicU8::new(ACTIVE),
        });
        collector
            .reader
            .register_collector(Arc::downgrade(&collector));

        otel_debug!(
            name: "MetricCollector.Registered",
            collector_id = handle.id,
            temporality = format!("{temporality:?}"),
        );
        Ok(collector)
    }

    /// The temporality of every [`MetricData`] this collector produces.
    pub fn temporality(&self) -> Temporality {
        self.handle.temporality
    }

    /// The current lifecycle state.
    pub fn state(&self) -> CollectorState {
        match self.state.load(Ordering::Acquire) {
            ACTIVE => CollectorState::Active,
            SHUTTING_DOWN => CollectorState::ShuttingDown,
            _ => CollectorState::Shutdown,
        }
    }

    /// Collects every meter of the provider for this collector.
    ///
    /// All meters registered when the pass starts are collected concurrently
    /// with one shared timestamp; their results are concatenated in meter
    /// registration order. The first failing meter fails the whole pass.
    pub async fn collect(&self) -> MetricResult<Vec<MetricData>> {
        if self.state() != CollectorState::Active {
            return Err(MetricError::AlreadyShutdown);
        }

        let collection_time = SystemTime::now();
        let meters = self.shared.meters()?;

        let per_meter = try_join_all(
            meters
                .iter()
                .map(|meter| meter.collect(&self.handle, collection_time)),
        )
        .await?;

        Ok(per_meter.into_iter().flatten().collect())
    }

    /// Asks the reader to flush.
    pub async fn force_flush(&self) -> MetricResult<()> {
        if self.state() != CollectorState::Active {
            return Err(MetricError::AlreadyShutdown);
        }
        self.reader.force_flush().await
    }

    /// Shuts the reader down.
    ///
    /// Only the first call proceeds, every later call fails with
    /// [`MetricError::AlreadyShutdown`].
    pub async fn shutdown(&self) -> MetricResult<()> {
        if self
            .state
            .compare_exchange(ACTIVE, SHUTTING_DOWN, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MetricError::AlreadyShutdown);
        }

        let result = self.reader.shutdown().await;
        self.state.store(SHUTDOWN, Ordering::Release);

        match &result {
            Ok(()) => {
                otel_debug!(
                    name: "MetricCollector.Shutdown",
                    collector_id = self.handle.id,
                );
            }
            Err(err) => {
                otel_warn!(
                    name: "MetricCollector.ShutdownFailed",
                    collector_id = self.handle.id,
                    reason = format!("{err}"),
                );
            }
        }
        result
    }
}

impl fmt::Debug for MetricCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricCollector")
            .field("id", &self.handle.id)
            .field("temporality", &self.handle.temporality)
            .field("state", &self.state())
            .field("reader", &self.reader)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::data::{AggregatedMetrics, MetricPoints};
    use crate::metrics::Meter;
    use crate::testing::metrics::TestMetricReader;
    use crate::Resource;
    use opentelemetry::InstrumentationScope;

    fn meter(shared: &Arc<MeterProviderSharedState>, name: &'static str) -> Meter {
        Meter::new(
            shared
                .meter(InstrumentationScope::builder(name).build())
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn failing_meter_fails_the_whole_pass() {
        let shared = MeterProviderSharedState::new(Resource::empty(), vec![]);
        let healthy =
            MetricCollector::register(Arc::clone(&shared), Box::new(TestMetricReader::new()))
                .unwrap();

        let _quiet = meter(&shared, "quiet");
        meter(&shared, "broken")
            .i64_counter("requests")
            .build()
            .add(2, &[]);

        // id 1 was never registered, so no stream has a partition for it
        let orphan = MetricCollector {
            handle: CollectorHandle::new(1, Temporality::Cumulative),
            shared: Arc::clone(&shared),
            reader: Box::new(TestMetricReader::new()),
            state: AtomicU8::new(ACTIVE),
        };

        match orphan.collect().await {
            Err(MetricError::MeterCollection { meter, .. }) => assert_eq!(meter, "broken"),
            other => panic!("expected a meter collection failure, got {other:?}"),
        }

        let metrics = healthy.collect().await.unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].scope.name(), "broken");
        match &metrics[0].data {
            AggregatedMetrics::I64(MetricPoints::Sum(sum)) => {
                assert_eq!(sum.data_points[0].value, 2)
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[tokio::test]
    async fn shutdown_moves_to_terminal_state() {
        let shared = MeterProviderSharedState::new(Resource::empty(), vec![]);
        let reader = TestMetricReader::new();
        let collector =
            MetricCollector::register(Arc::clone(&shared), Box::new(reader.clone())).unwrap();

        assert_eq!(collector.state(), CollectorState::Active);
        collector.shutdown().await.unwrap();
        assert_eq!(collector.state(), CollectorState::Shutdown);
        assert!(reader.is_shutdown());
        assert!(matches!(
            collector.collect().await,
            Err(MetricError::AlreadyShutdown)
        ));
    }
}
