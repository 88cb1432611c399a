use core::fmt;
use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::SystemTime;

use opentelemetry::InstrumentationScope;

use crate::metrics::aggregation::Aggregation;
use crate::metrics::collector::CollectorHandle;
use crate::metrics::data::MetricData;
use crate::metrics::error::{MetricError, MetricResult};
use crate::metrics::instrument::{
    create_instrument_descriptor, AsyncInstrumentBuilder, Callback, Counter, Histogram,
    HistogramBuilder, InstrumentBuilder, InstrumentDescriptor, InstrumentKind, InstrumentOptions,
    ObservableCounter, ObservableGauge, ObservableUpDownCounter, Observer, SyncMeasure,
    UpDownCounter, ValueType,
};
use crate::metrics::internal::{Filter, Number};
use crate::metrics::state::MeterProviderSharedState;
use crate::metrics::storage::{MetricStorage, ResolvedMeasures, Storage};
use crate::metrics::view::apply_view;
use crate::Resource;

// maximum length of instrument name
const INSTRUMENT_NAME_MAX_LENGTH: usize = 255;
// maximum length of instrument unit name
const INSTRUMENT_UNIT_NAME_MAX_LENGTH: usize = 63;
const INSTRUMENT_NAME_ALLOWED_NON_ALPHANUMERIC_CHARS: [char; 4] = ['_', '.', '-', '/'];

// instrument validation error strings
const INSTRUMENT_NAME_EMPTY: &str = "instrument name must be non-empty";
const INSTRUMENT_NAME_LENGTH: &str = "instrument name must be less than 256 characters";
const INSTRUMENT_NAME_INVALID_CHAR: &str =
    "characters in instrument name must be ASCII and belong to the alphanumeric characters, '_', '.', '-' and '/'";
const INSTRUMENT_NAME_FIRST_ALPHABETIC: &str =
    "instrument name must start with an alphabetic character";
const INSTRUMENT_UNIT_LENGTH: &str = "instrument unit must be less than 64 characters";
const INSTRUMENT_UNIT_INVALID_CHAR: &str = "characters in instrument unit must be ASCII";

/// Owns the instruments of one instrumentation scope.
///
/// Every instrument is resolved into one or more streams (one per matching
/// view, or a single default stream). Each stream keeps one partition per
/// registered collector.
pub(crate) struct SdkMeter {
    scope: InstrumentationScope,
    resource: Resource,
    shared: Weak<MeterProviderSharedState>,
    instruments: RwLock<Instruments>,
    conflicts: AtomicUsize,
}

#[derive(Default)]
struct Instruments {
    /// In creation order, which is also export order.
    streams: Vec<Arc<dyn Storage>>,
    by_id: HashMap<StreamId, usize>,
    /// The first descriptor registered under each lowercased name.
    by_name: HashMap<String, InstrumentDescriptor>,
    observables: Vec<Arc<dyn ObservableInstrument>>,
}

/// The identity of a stream; the description is not part of it.
#[derive(Debug, Hash, PartialEq, Eq)]
struct StreamId {
    name: String,
    kind: InstrumentKind,
    value_type: ValueType,
    unit: Cow<'static, str>,
    aggregation: String,
}

impl StreamId {
    fn new(descriptor: &InstrumentDescriptor, aggregation: &Aggregation) -> Self {
        StreamId {
            // Instrument names are case-insensitive ASCII.
            name: descriptor.name.to_ascii_lowercase(),
            kind: descriptor.kind,
            value_type: descriptor.value_type,
            unit: descriptor.unit.clone(),
            aggregation: format!("{aggregation:?}"),
        }
    }
}

struct ResolvedStream {
    descriptor: InstrumentDescriptor,
    aggregation: Aggregation,
    filter: Option<Filter>,
}

impl SdkMeter {
    pub(crate) fn new(
        scope: InstrumentationScope,
        resource: Resource,
        shared: Weak<MeterProviderSharedState>,
    ) -> Self {
        SdkMeter {
            scope,
            resource,
            shared,
            instruments: RwLock::new(Instruments::default()),
            conflicts: AtomicUsize::new(0),
        }
    }

    /// A meter that records nothing, handed out once the provider is shut down.
    pub(crate) fn noop(scope: InstrumentationScope) -> Self {
        SdkMeter::new(scope, Resource::empty(), Weak::new())
    }

    pub(crate) fn scope(&self) -> &InstrumentationScope {
        &self.scope
    }

    /// Gives every stream of this meter a fresh partition for `collector`.
    pub(crate) fn add_partitions(&self, collector: &CollectorHandle) -> MetricResult<()> {
        let instruments = self.instruments.read()?;
        for stream in &instruments.streams {
            stream.add_partition(collector)?;
        }
        Ok(())
    }

    /// Produces this meter's data for one collector.
    ///
    /// Observable callbacks run first, for this collector only. Streams without
    /// points are left out.
    pub(crate) async fn collect(
        &self,
        collector: &CollectorHandle,
        collection_time: SystemTime,
    ) -> MetricResult<Vec<MetricData>> {
        let (streams, observables) = {
            let instruments = self
                .instruments
                .read()
                .map_err(|err| self.collection_error(err.to_string()))?;
            (
                instruments.streams.clone(),
                instruments.observables.clone(),
            )
        };

        for observable in &observables {
            observable.observe(collector);
        }

        let mut data = Vec::with_capacity(streams.len());
        for stream in &streams {
            let points = stream
                .collect(collector, collection_time)
                .map_err(|err| self.collection_error(err.to_string()))?;
            if let Some(points) = points {
                data.push(MetricData {
                    descriptor: stream.descriptor().clone(),
                    resource: self.resource.clone(),
                    scope: self.scope.clone(),
                    temporality: collector.temporality,
                    data: points,
                });
            }
        }

        Ok(data)
    }

    fn collection_error(&self, reason: String) -> MetricError {
        MetricError::MeterCollection {
            meter: self.scope.name().to_string(),
            reason,
        }
    }

    /// Number of conflicting instrument definitions seen so far.
    pub(crate) fn conflicts(&self) -> usize {
        self.conflicts.load(Ordering::Relaxed)
    }

    fn create_sync<T: Number>(
        &self,
        kind: InstrumentKind,
        name: Cow<'static, str>,
        description: Option<Cow<'static, str>>,
        unit: Option<Cow<'static, str>>,
        boundaries: Option<Vec<f64>>,
    ) -> Option<Arc<dyn SyncMeasure<T>>> {
        let descriptor = self.validated_descriptor::<T>(kind, name, description, unit)?;
        match self.resolve::<T>(&descriptor, boundaries.as_deref()) {
            Ok(measures) if measures.is_empty() => None,
            Ok(measures) => Some(Arc::new(ResolvedMeasures { measures }) as Arc<dyn SyncMeasure<T>>),
            Err(err) => {
                otel_error!(
                    name: "InstrumentCreationFailed",
                    meter_name = self.scope.name(),
                    instrument_name = descriptor.name.as_ref(),
                    reason = format!("{err}"),
                );
                None
            }
        }
    }

    fn create_observable<T: Number>(
        &self,
        kind: InstrumentKind,
        name: Cow<'static, str>,
        description: Option<Cow<'static, str>>,
        unit: Option<Cow<'static, str>>,
        callbacks: Vec<Callback<T>>,
    ) {
        let Some(descriptor) = self.validated_descriptor::<T>(kind, name, description, unit) else {
            return;
        };

        let storages = match self.resolve::<T>(&descriptor, None) {
            Ok(storages) => storages,
            Err(err) => {
                otel_error!(
                    name: "InstrumentCreationFailed",
                    meter_name = self.scope.name(),
                    instrument_name = descriptor.name.as_ref(),
                    reason = format!("{err}"),
                );
                return;
            }
        };
        if storages.is_empty() || callbacks.is_empty() {
            return;
        }

        let observable = Arc::new(Observable {
            name: descriptor.name,
            storages,
            callbacks,
        });
        match self.instruments.write() {
            Ok(mut instruments) => instruments.observables.push(observable),
            Err(err) => {
                otel_error!(
                    name: "ObservableCallback.RegistrationFailed",
                    meter_name = self.scope.name(),
                    reason = format!("{err}"),
                );
            }
        }
    }

    fn validated_descriptor<T: Number>(
        &self,
        kind: InstrumentKind,
        name: Cow<'static, str>,
        description: Option<Cow<'static, str>>,
        unit: Option<Cow<'static, str>>,
    ) -> Option<InstrumentDescriptor> {
        if let Err(err) = validate_instrument_config(name.as_ref(), unit.as_deref()) {
            otel_error!(
                name: "InstrumentCreationFailed",
                meter_name = self.scope.name(),
                instrument_name = name.as_ref(),
                reason = format!("{err}"),
            );
            return None;
        }

        Some(create_instrument_descriptor(
            name,
            kind,
            InstrumentOptions {
                description,
                unit,
                value_type: Some(T::VALUE_TYPE),
            },
        ))
    }

    /// Resolves the streams of an instrument, reusing existing storage for
    /// streams already known to this meter.
    ///
    /// Returns no streams when the provider is gone or every matching view
    /// drops the instrument.
    fn resolve<T: Number>(
        &self,
        descriptor: &InstrumentDescriptor,
        boundaries: Option<&[f64]>,
    ) -> MetricResult<Vec<Arc<MetricStorage<T>>>> {
        let Some(shared) = self.shared.upgrade() else {
            return Ok(Vec::new());
        };

        let streams = self.streams_for(&shared, descriptor, boundaries);
        if streams.is_empty() {
            return Ok(Vec::new());
        }

        let collectors = shared.collectors().read()?;
        let mut guard = self.instruments.write()?;
        let instruments = &mut *guard;

        let mut resolved: Vec<Arc<MetricStorage<T>>> = Vec::with_capacity(streams.len());
        for stream in streams {
            let id = StreamId::new(&stream.descriptor, &stream.aggregation);

            let storage = if let Some(&index) = instruments.by_id.get(&id) {
                let existing = Arc::clone(&instruments.streams[index]);
                if existing.descriptor().description != stream.descriptor.description {
                    otel_warn!(
                        name: "Instrument.DescriptionMismatch",
                        meter_name = self.scope.name(),
                        instrument_name = stream.descriptor.name.as_ref(),
                        message = "instrument re-created with another description, keeping the first one",
                    );
                }
                existing.as_any().downcast::<MetricStorage<T>>().map_err(|_| {
                    MetricError::Other(format!(
                        "stream {} is registered with another value type",
                        stream.descriptor.name
                    ))
                })?
            } else {
                let name = stream.descriptor.name.to_ascii_lowercase();
                if let Some(existing) = instruments.by_name.get(&name) {
                    self.conflicts.fetch_add(1, Ordering::Relaxed);
                    otel_warn!(
                        name: "Instrument.DuplicateMetricStreamDefinitions",
                        meter_name = self.scope.name(),
                        message = "duplicate metric stream definitions, both streams are exported",
                        reason = format!(
                            "{}",
                            MetricError::Conflict(format!(
                                "names: ({} and {}), kinds: ({:?} and {:?}), units: ({} and {}), value types: ({} and {})",
                                existing.name, stream.descriptor.name,
                                existing.kind, stream.descriptor.kind,
                                existing.unit, stream.descriptor.unit,
                                existing.value_type, stream.descriptor.value_type,
                            ))
                        ),
                    );
                } else {
                    instruments
                        .by_name
                        .insert(name, stream.descriptor.clone());
                }

                let storage = Arc::new(MetricStorage::<T>::new(
                    stream.descriptor,
                    stream.aggregation,
                    stream.filter,
                    &collectors,
                )?);
                otel_debug!(
                    name: "InstrumentCreated",
                    meter_name = self.scope.name(),
                    instrument_name = storage.descriptor().name.as_ref(),
                    aggregation = format!("{}", storage.aggregation()),
                );
                let index = instruments.streams.len();
                instruments
                    .streams
                    .push(Arc::clone(&storage) as Arc<dyn Storage>);
                instruments.by_id.insert(id, index);
                storage
            };

            if !resolved.iter().any(|s| Arc::ptr_eq(s, &storage)) {
                resolved.push(storage);
            }
        }

        Ok(resolved)
    }

    /// One stream per matching view, or the default stream when no view
    /// matches.
    fn streams_for(
        &self,
        shared: &MeterProviderSharedState,
        descriptor: &InstrumentDescriptor,
        boundaries: Option<&[f64]>,
    ) -> Vec<ResolvedStream> {
        let mut matched = false;
        let mut streams = Vec::new();

        for view in shared.views() {
            if !view.matches(descriptor, &self.scope) {
                continue;
            }
            matched = true;

            let aggregation = view.aggregation.clone().unwrap_or(Aggregation::Default);
            if let Err(err) = aggregation.is_compatible_with(descriptor.kind) {
                otel_warn!(
                    name: "View.IncompatibleAggregation",
                    meter_name = self.scope.name(),
                    instrument_name = descriptor.name.as_ref(),
                    reason = format!("{err}"),
                );
                continue;
            }
            if aggregation == Aggregation::Drop {
                otel_debug!(
                    name: "View.StreamDropped",
                    meter_name = self.scope.name(),
                    instrument_name = descriptor.name.as_ref(),
                );
                continue;
            }

            streams.push(ResolvedStream {
                descriptor: apply_view(view, descriptor),
                aggregation: resolve_default(aggregation, descriptor.kind, boundaries),
                filter: view.attribute_filter.clone(),
            });
        }

        if !matched {
            streams.push(ResolvedStream {
                descriptor: descriptor.clone(),
                aggregation: resolve_default(Aggregation::Default, descriptor.kind, boundaries),
                filter: None,
            });
        }

        streams
    }
}

/// Replaces [`Aggregation::Default`] with the aggregation for `kind`, using
/// the instrument's own bucket boundaries when it has valid ones.
fn resolve_default(
    aggregation: Aggregation,
    kind: InstrumentKind,
    boundaries: Option<&[f64]>,
) -> Aggregation {
    if aggregation != Aggregation::Default {
        return aggregation;
    }
    if let (InstrumentKind::Histogram, Some(boundaries)) = (kind, boundaries) {
        let advised = Aggregation::ExplicitBucketHistogram {
            boundaries: boundaries.to_vec(),
            record_min_max: true,
        };
        match advised.validate() {
            Ok(()) => return advised,
            Err(err) => {
                otel_warn!(
                    name: "Histogram.InvalidBoundaries",
                    reason = format!("{err}"),
                    message = "using the default boundaries",
                );
            }
        }
    }
    Aggregation::default_for(kind)
}

impl fmt::Debug for SdkMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meter").field("scope", &self.scope).finish()
    }
}

/// Runs the callbacks of one observable instrument.
trait ObservableInstrument: Send + Sync {
    fn observe(&self, collector: &CollectorHandle);
}

struct Observable<T: Number> {
    name: Cow<'static, str>,
    storages: Vec<Arc<MetricStorage<T>>>,
    callbacks: Vec<Callback<T>>,
}

impl<T: Number> ObservableInstrument for Observable<T> {
    fn observe(&self, collector: &CollectorHandle) {
        for callback in &self.callbacks {
            let observer = Observer::new();
            let reason = match panic::catch_unwind(AssertUnwindSafe(|| callback(&observer))) {
                Ok(Ok(())) => {
                    for (value, attrs) in observer.into_observations() {
                        for storage in &self.storages {
                            storage.measure_for(collector, value, &attrs);
                        }
                    }
                    continue;
                }
                Ok(Err(err)) => err.to_string(),
                Err(payload) => panic_message(payload.as_ref()),
            };

            let failure = MetricError::CallbackFailure {
                instrument: self.name.to_string(),
                reason,
            };
            otel_warn!(
                name: "ObservableCallback.Failed",
                instrument_name = self.name.as_ref(),
                collector_id = collector.id,
                reason = format!("{failure}"),
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "callback panicked".to_string()
    }
}

fn validate_instrument_config(name: &str, unit: Option<&str>) -> MetricResult<()> {
    validate_instrument_name(name).and_then(|_| validate_instrument_unit(unit))
}

fn validate_instrument_name(name: &str) -> MetricResult<()> {
    if name.is_empty() {
        return Err(MetricError::InvalidInstrumentConfiguration(
            INSTRUMENT_NAME_EMPTY,
        ));
    }
    if name.len() > INSTRUMENT_NAME_MAX_LENGTH {
        return Err(MetricError::InvalidInstrumentConfiguration(
            INSTRUMENT_NAME_LENGTH,
        ));
    }
    if name.starts_with(|c: char| !c.is_ascii_alphabetic()) {
        return Err(MetricError::InvalidInstrumentConfiguration(
            INSTRUMENT_NAME_FIRST_ALPHABETIC,
        ));
    }
    if name.contains(|c: char| {
        !c.is_ascii_alphanumeric() && !INSTRUMENT_NAME_ALLOWED_NON_ALPHANUMERIC_CHARS.contains(&c)
    }) {
        return Err(MetricError::InvalidInstrumentConfiguration(
            INSTRUMENT_NAME_INVALID_CHAR,
        ));
    }
    Ok(())
}

fn validate_instrument_unit(unit: Option<&str>) -> MetricResult<()> {
    if let Some(unit) = unit {
        if unit.len() > INSTRUMENT_UNIT_NAME_MAX_LENGTH {
            return Err(MetricError::InvalidInstrumentConfiguration(
                INSTRUMENT_UNIT_LENGTH,
            ));
        }
        if unit.contains(|c: char| !c.is_ascii()) {
            return Err(MetricError::InvalidInstrumentConfiguration(
                INSTRUMENT_UNIT_INVALID_CHAR,
            ));
        }
    }
    Ok(())
}

/// Creates instruments for one instrumentation scope.
///
/// Obtained from [`SdkMeterProvider::meter`](super::SdkMeterProvider::meter).
/// Cloning is cheap, clones share the same instruments.
#[derive(Clone)]
pub struct Meter {
    inner: Arc<SdkMeter>,
}

impl Meter {
    pub(crate) fn new(inner: Arc<SdkMeter>) -> Self {
        Meter { inner }
    }

    /// The instrumentation scope this meter was created with.
    pub fn scope(&self) -> &InstrumentationScope {
        self.inner.scope()
    }

    /// How many instruments were created with the name of an existing one but
    /// an incompatible kind, unit or value type.
    ///
    /// Such instruments are kept as separate streams, which a backend will see
    /// as duplicates.
    pub fn conflicts(&self) -> usize {
        self.inner.conflicts()
    }

    /// creates an instrument builder for recording increasing `i64` values.
    pub fn i64_counter(&self, name: impl Into<Cow<'static, str>>) -> InstrumentBuilder<'_, Counter<i64>> {
        InstrumentBuilder::new(self, name.into())
    }

    /// creates an instrument builder for recording increasing `f64` values.
    pub fn f64_counter(&self, name: impl Into<Cow<'static, str>>) -> InstrumentBuilder<'_, Counter<f64>> {
        InstrumentBuilder::new(self, name.into())
    }

    /// creates an instrument builder for recording changes of an `i64` value.
    pub fn i64_up_down_counter(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> InstrumentBuilder<'_, UpDownCounter<i64>> {
        InstrumentBuilder::new(self, name.into())
    }

    /// creates an instrument builder for recording changes of an `f64` value.
    pub fn f64_up_down_counter(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> InstrumentBuilder<'_, UpDownCounter<f64>> {
        InstrumentBuilder::new(self, name.into())
    }

    /// creates an instrument builder for recording a distribution of `i64` values.
    pub fn i64_histogram(&self, name: impl Into<Cow<'static, str>>) -> HistogramBuilder<'_, i64> {
        HistogramBuilder::new(self, name.into())
    }

    /// creates an instrument builder for recording a distribution of `f64` values.
    pub fn f64_histogram(&self, name: impl Into<Cow<'static, str>>) -> HistogramBuilder<'_, f64> {
        HistogramBuilder::new(self, name.into())
    }

    /// creates an instrument builder for reporting increasing `i64` totals.
    pub fn i64_observable_counter(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> AsyncInstrumentBuilder<'_, ObservableCounter<i64>, i64> {
        AsyncInstrumentBuilder::new(self, name.into())
    }

    /// creates an instrument builder for reporting increasing `f64` totals.
    pub fn f64_observable_counter(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> AsyncInstrumentBuilder<'_, ObservableCounter<f64>, f64> {
        AsyncInstrumentBuilder::new(self, name.into())
    }

    /// creates an instrument builder for reporting `i64` totals that may go down.
    pub fn i64_observable_up_down_counter(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> AsyncInstrumentBuilder<'_, ObservableUpDownCounter<i64>, i64> {
        AsyncInstrumentBuilder::new(self, name.into())
    }

    /// creates an instrument builder for reporting `f64` totals that may go down.
    pub fn f64_observable_up_down_counter(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> AsyncInstrumentBuilder<'_, ObservableUpDownCounter<f64>, f64> {
        AsyncInstrumentBuilder::new(self, name.into())
    }

    /// creates an instrument builder for reporting current `i64` values.
    pub fn i64_observable_gauge(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> AsyncInstrumentBuilder<'_, ObservableGauge<i64>, i64> {
        AsyncInstrumentBuilder::new(self, name.into())
    }

    /// creates an instrument builder for reporting current `f64` values.
    pub fn f64_observable_gauge(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> AsyncInstrumentBuilder<'_, ObservableGauge<f64>, f64> {
        AsyncInstrumentBuilder::new(self, name.into())
    }
}

impl fmt::Debug for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

macro_rules! sync_build {
    ($inst:ident, $ty:ty, $kind:expr) => {
        impl InstrumentBuilder<'_, $inst<$ty>> {
            /// Validates the instrument configuration and creates the
            /// instrument.
            ///
            /// An invalid configuration is logged and yields an instrument
            /// that records nothing.
            pub fn build(self) -> $inst<$ty> {
                self.meter
                    .inner
                    .create_sync::<$ty>($kind, self.name, self.description, self.unit, None)
                    .map_or_else($inst::noop, $inst::new)
            }
        }
    };
}

sync_build!(Counter, i64, InstrumentKind::Counter);
sync_build!(Counter, f64, InstrumentKind::Counter);
sync_build!(UpDownCounter, i64, InstrumentKind::UpDownCounter);
sync_build!(UpDownCounter, f64, InstrumentKind::UpDownCounter);

macro_rules! histogram_build {
    ($ty:ty) => {
        impl HistogramBuilder<'_, $ty> {
            /// Validates the instrument configuration and creates the
            /// histogram.
            ///
            /// An invalid configuration is logged and yields an instrument
            /// that records nothing.
            pub fn build(self) -> Histogram<$ty> {
                self.meter
                    .inner
                    .create_sync::<$ty>(
                        InstrumentKind::Histogram,
                        self.name,
                        self.description,
                        self.unit,
                        self.boundaries,
                    )
                    .map_or_else(Histogram::noop, Histogram::new)
            }
        }
    };
}

histogram_build!(i64);
histogram_build!(f64);

macro_rules! observable_build {
    ($inst:ident, $ty:ty, $kind:expr) => {
        impl AsyncInstrumentBuilder<'_, $inst<$ty>, $ty> {
            /// Validates the instrument configuration, creates the instrument
            /// and registers its callbacks.
            pub fn build(self) -> $inst<$ty> {
                self.meter.inner.create_observable::<$ty>(
                    $kind,
                    self.name,
                    self.description,
                    self.unit,
                    self.callbacks,
                );
                $inst::new()
            }
        }
    };
}

observable_build!(ObservableCounter, i64, InstrumentKind::ObservableCounter);
observable_build!(ObservableCounter, f64, InstrumentKind::ObservableCounter);
observable_build!(
    ObservableUpDownCounter,
    i64,
    InstrumentKind::ObservableUpDownCounter
);
observable_build!(
    ObservableUpDownCounter,
    f64,
    InstrumentKind::ObservableUpDownCounter
);
observable_build!(ObservableGauge, i64, InstrumentKind::ObservableGauge);
observable_build!(ObservableGauge, f64, InstrumentKind::ObservableGauge);
