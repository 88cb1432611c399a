use core::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock,
};

use futures_executor::block_on;
use opentelemetry::InstrumentationScope;

use crate::Resource;

use super::{
    collector::MetricCollector,
    error::{MetricError, MetricResult},
    meter::{Meter, SdkMeter},
    reader::MetricReader,
    state::MeterProviderSharedState,
    view::View,
};

/// Handles the creation and coordination of [Meter]s.
///
/// All `Meter`s created by a provider are associated with the same
/// [Resource], have the same [View]s applied to them, and are collected by
/// every registered [MetricReader]. This is a clonable handle: cloning creates
/// a new reference, not a new provider. Dropping the last reference shuts the
/// provider down. Shutdown can also be triggered by calling
/// [`SdkMeterProvider::shutdown`].
#[derive(Clone, Debug)]
pub struct SdkMeterProvider {
    inner: Arc<SdkMeterProviderInner>,
}

#[derive(Debug)]
struct SdkMeterProviderInner {
    shared: Arc<MeterProviderSharedState>,
    collectors: RwLock<Vec<Arc<MetricCollector>>>,
    shutdown_invoked: AtomicBool,
}

impl Default for SdkMeterProvider {
    fn default() -> Self {
        SdkMeterProvider::builder().build()
    }
}

impl SdkMeterProvider {
    /// Return default [MeterProviderBuilder]
    pub fn builder() -> MeterProviderBuilder {
        MeterProviderBuilder::default()
    }

    /// Returns the meter for `name`, creating it on first use.
    pub fn meter(&self, name: &'static str) -> Meter {
        self.meter_with_scope(InstrumentationScope::builder(name).build())
    }

    /// Returns the meter for `scope`, creating it on first use.
    ///
    /// Meters are identified by the whole scope, so two scopes with the same
    /// name but different versions yield two meters. Once the provider is shut
    /// down a meter that records nothing is returned.
    pub fn meter_with_scope(&self, scope: InstrumentationScope) -> Meter {
        if self.inner.shutdown_invoked.load(Ordering::Relaxed) {
            otel_debug!(
                name: "MeterProvider.NoOpMeterReturned",
                meter_name = scope.name(),
            );
            return Meter::new(Arc::new(SdkMeter::noop(scope)));
        }

        if scope.name().is_empty() {
            otel_info!(name: "MeterNameEmpty", message = "Meter name is empty; consider providing a meaningful name. Meter will function normally and the provided name will be used as-is.");
        };

        match self.inner.shared.meter(scope.clone()) {
            Ok(meter) => Meter::new(meter),
            Err(err) => {
                otel_error!(
                    name: "MeterProvider.NoOpMeterReturned",
                    meter_name = scope.name(),
                    reason = format!("{err}"),
                );
                Meter::new(Arc::new(SdkMeter::noop(scope)))
            }
        }
    }

    /// Registers a reader after the provider was built.
    ///
    /// The reader's collector starts with empty partitions, so it only sees
    /// measurements recorded from now on.
    pub fn register_reader<R: MetricReader>(&self, reader: R) -> MetricResult<Arc<MetricCollector>> {
        if self.inner.shutdown_invoked.load(Ordering::Relaxed) {
            return Err(MetricError::AlreadyShutdown);
        }
        self.inner.register(Box::new(reader))
    }

    /// Flushes all readers.
    ///
    /// Every reader is flushed even when an earlier one fails; the failures
    /// are reported together.
    pub async fn force_flush(&self) -> MetricResult<()> {
        if self.inner.shutdown_invoked.load(Ordering::Relaxed) {
            return Err(MetricError::AlreadyShutdown);
        }
        let collectors = self.inner.collectors()?;

        let mut errs = vec![];
        for collector in collectors {
            if let Err(err) = collector.force_flush().await {
                errs.push(err);
            }
        }
        combine("flush", errs)
    }

    /// Shuts down the provider and every reader.
    ///
    /// The first call performs the shutdown; later calls fail with
    /// [`MetricError::AlreadyShutdown`]. Instruments created earlier keep
    /// accepting measurements, which are never exported.
    pub async fn shutdown(&self) -> MetricResult<()> {
        otel_info!(
            name: "MeterProvider.Shutdown",
            message = "User initiated shutdown of MeterProvider."
        );
        self.inner.shutdown().await
    }
}

impl SdkMeterProviderInner {
    fn register(&self, reader: Box<dyn MetricReader>) -> MetricResult<Arc<MetricCollector>> {
        let collector = MetricCollector::register(Arc::clone(&self.shared), reader)?;
        self.collectors.write()?.push(Arc::clone(&collector));
        Ok(collector)
    }

    fn collectors(&self) -> MetricResult<Vec<Arc<MetricCollector>>> {
        Ok(self.collectors.read()?.clone())
    }

    async fn shutdown(&self) -> MetricResult<()> {
        if self.shutdown_invoked.swap(true, Ordering::SeqCst) {
            // If the previous value was true, shutdown was already invoked.
            return Err(MetricError::AlreadyShutdown);
        }
        let collectors = self.collectors()?;

        let mut errs = vec![];
        for collector in collectors {
            if let Err(err) = collector.shutdown().await {
                errs.push(err);
            }
        }
        combine("shutdown", errs)
    }
}

fn combine(operation: &str, mut errs: Vec<MetricError>) -> MetricResult<()> {
    match errs.len() {
        0 => Ok(()),
        1 => Err(errs.remove(0)),
        _ => Err(MetricError::Other(format!(
            "{operation} failed for {} readers: {}",
            errs.len(),
            errs.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        ))),
    }
}

impl Drop for SdkMeterProviderInner {
    fn drop(&mut self) {
        // If user has already shutdown the provider manually by calling
        // shutdown(), then we don't need to call shutdown again.
        if self.shutdown_invoked.load(Ordering::Relaxed) {
            otel_debug!(
                name: "MeterProvider.Drop.AlreadyShutdown",
                message = "MeterProvider was already shut down; drop will not attempt shutdown again."
            );
        } else {
            otel_info!(
                name: "MeterProvider.Drop",
                message = "Last reference of MeterProvider dropped, initiating shutdown."
            );
            if let Err(err) = block_on(self.shutdown()) {
                otel_error!(
                    name: "MeterProvider.Drop.ShutdownFailed",
                    message = "Shutdown attempt failed during drop of MeterProvider.",
                    reason = format!("{}", err)
                );
            } else {
                otel_info!(
                    name: "MeterProvider.Drop.ShutdownCompleted",
                );
            }
        }
    }
}

/// Configuration options for a [SdkMeterProvider].
#[derive(Default)]
pub struct MeterProviderBuilder {
    resource: Option<Resource>,
    readers: Vec<Box<dyn MetricReader>>,
    views: Vec<Arc<View>>,
}

impl MeterProviderBuilder {
    /// Associates a [Resource] with the provider.
    ///
    /// This [Resource] represents the entity producing telemetry and is
    /// attached to every [`MetricData`](super::data::MetricData) the provider
    /// produces.
    ///
    /// By default, if this option is not used, the default [Resource] will be used.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Associates a [MetricReader] with the provider.
    ///
    /// A provider exports no metrics without a reader.
    pub fn with_reader<T: MetricReader>(mut self, reader: T) -> Self {
        self.readers.push(Box::new(reader));
        self
    }

    /// Associates a [View] with the provider.
    ///
    /// [View]s are appended to existing ones if this option is used multiple
    /// times. Instruments no view matches are exported as they were created.
    pub fn with_view(mut self, view: View) -> Self {
        self.views.push(Arc::new(view));
        self
    }

    /// Construct a new [SdkMeterProvider] with this configuration.
    pub fn build(self) -> SdkMeterProvider {
        otel_debug!(
            name: "MeterProvider.Building",
            builder = format!("{:?}", &self),
        );

        let inner = SdkMeterProviderInner {
            shared: MeterProviderSharedState::new(
                self.resource.unwrap_or_else(|| Resource::builder().build()),
                self.views,
            ),
            collectors: RwLock::new(Vec::with_capacity(self.readers.len())),
            shutdown_invoked: AtomicBool::new(false),
        };
        for reader in self.readers {
            if let Err(err) = inner.register(reader) {
                otel_error!(
                    name: "MeterProvider.ReaderRegistrationFailed",
                    reason = format!("{err}"),
                );
            }
        }

        otel_info!(
            name: "MeterProvider.Built",
        );
        SdkMeterProvider {
            inner: Arc::new(inner),
        }
    }
}

impl fmt::Debug for MeterProviderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeterProviderBuilder")
            .field("resource", &self.resource)
            .field("readers", &self.readers)
            .field("views", &self.views.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{SERVICE_NAME, TELEMETRY_SDK_LANGUAGE};
    use crate::metrics::ManualReader;
    use crate::testing::metrics::metric_reader::TestMetricReader;
    use opentelemetry::{Key, KeyValue, Value};

    async fn exported_resource(provider: &SdkMeterProvider, reader: &ManualReader) -> Resource {
        provider.meter("test").i64_counter("c").build().add(1, &[]);
        let metrics = reader.collect().await.unwrap();
        metrics[0].resource.clone()
    }

    #[tokio::test]
    async fn default_resource_is_detected() {
        let reader = ManualReader::builder().build();
        let provider = temp_env::with_vars_unset(["OTEL_SERVICE_NAME", "OTEL_RESOURCE_ATTRIBUTES"], || {
            SdkMeterProvider::builder()
                .with_reader(reader.clone())
                .build()
        });

        let resource = exported_resource(&provider, &reader).await;
        assert_eq!(
            resource.get(&Key::from_static_str(SERVICE_NAME)),
            Some(Value::from("unknown_service"))
        );
        assert_eq!(
            resource.get(&Key::from_static_str(TELEMETRY_SDK_LANGUAGE)),
            Some(Value::from("rust"))
        );
    }

    #[tokio::test]
    async fn custom_resource_replaces_default() {
        let reader = ManualReader::builder().build();
        let provider = SdkMeterProvider::builder()
            .with_resource(
                Resource::builder_empty()
                    .with_attributes([KeyValue::new("host", "a")])
                    .build(),
            )
            .with_reader(reader.clone())
            .build();
        assert_eq!(exported_resource(&provider, &reader).await.len(), 1);
    }

    #[tokio::test]
    async fn shutdown_reaches_every_reader_once() {
        let first = TestMetricReader::new();
        let second = TestMetricReader::new();
        let provider = SdkMeterProvider::builder()
            .with_reader(first.clone())
            .with_reader(second.clone())
            .build();
        let counter = provider.meter("test").i64_counter("requests").build();

        assert!(provider.shutdown().await.is_ok());
        assert!(first.is_shutdown());
        assert!(second.is_shutdown());

        assert!(matches!(
            provider.shutdown().await,
            Err(MetricError::AlreadyShutdown)
        ));
        assert!(matches!(
            provider.force_flush().await,
            Err(MetricError::AlreadyShutdown)
        ));
        // instruments created before shutdown stay usable
        counter.add(1, &[]);
    }

    #[tokio::test]
    async fn force_flush_reaches_every_reader() {
        let reader = TestMetricReader::new();
        let provider = SdkMeterProvider::builder()
            .with_reader(reader.clone())
            .build();
        provider.force_flush().await.unwrap();
        provider.force_flush().await.unwrap();
        assert_eq!(reader.flush_count(), 2);
    }

    #[test]
    fn shutdown_invoked_on_last_drop() {
        let reader = TestMetricReader::new();
        let provider = SdkMeterProvider::builder()
            .with_reader(reader.clone())
            .build();
        let clone1 = provider.clone();
        let clone2 = provider.clone();

        drop(clone1);
        assert!(!reader.is_shutdown());
        drop(clone2);
        assert!(!reader.is_shutdown());

        drop(provider);
        assert!(reader.is_shutdown());
    }

    #[test]
    fn same_meter_reused_same_scope() {
        let provider = SdkMeterProvider::builder().build();
        let _meter1 = provider.meter("test");
        let _meter2 = provider.meter("test");
        assert_eq!(provider.inner.shared.meters().unwrap().len(), 1);

        let scope = InstrumentationScope::builder("test")
            .with_version("1.0.0")
            .with_schema_url("http://example.com")
            .build();
        let _meter3 = provider.meter_with_scope(scope.clone());
        let _meter4 = provider.meter_with_scope(scope);
        assert_eq!(provider.inner.shared.meters().unwrap().len(), 2);

        // meter names are case sensitive
        let _meter5 = provider.meter("ABC");
        let _meter6 = provider.meter("abc");
        assert_eq!(provider.inner.shared.meters().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn no_meters_or_readers_after_shutdown() {
        let provider = SdkMeterProvider::builder().build();
        provider.shutdown().await.unwrap();

        let meter = provider.meter("late");
        assert_eq!(meter.scope().name(), "late");
        assert!(provider.inner.shared.meters().unwrap().is_empty());
        assert!(matches!(
            provider.register_reader(TestMetricReader::new()),
            Err(MetricError::AlreadyShutdown)
        ));
    }

    #[tokio::test]
    async fn shutdown_errors_are_combined() {
        let first = TestMetricReader::new();
        let second = TestMetricReader::new();
        let provider = SdkMeterProvider::builder()
            .with_reader(first.clone())
            .with_reader(second.clone())
            .build();
        first.shutdown_now();
        second.shutdown_now();

        match provider.shutdown().await {
            Err(MetricError::Other(msg)) => assert!(msg.contains("2 readers")),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
