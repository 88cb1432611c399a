use std::{borrow::Cow, cell::RefCell, error::Error, fmt, marker::PhantomData, sync::Arc};

use opentelemetry::KeyValue;

use crate::metrics::meter::Meter;

/// The identifier of a group of instruments that all perform the same function.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum InstrumentKind {
    /// Identifies a group of instruments that record increasing values synchronously
    /// with the code path they are measuring.
    Counter,
    /// A group of instruments that record increasing and decreasing values
    /// synchronously with the code path they are measuring.
    UpDownCounter,
    /// A group of instruments that record a distribution of values synchronously with
    /// the code path they are measuring.
    Histogram,
    /// A group of instruments that record increasing values in an asynchronous
    /// callback.
    ObservableCounter,
    /// A group of instruments that record increasing and decreasing values in an
    /// asynchronous callback.
    ObservableUpDownCounter,
    /// A group of instruments that record current values in an asynchronous callback.
    ObservableGauge,
}

impl InstrumentKind {
    /// Whether measurements of this kind are produced by callbacks during
    /// collection.
    pub fn is_observable(&self) -> bool {
        matches!(
            self,
            InstrumentKind::ObservableCounter
                | InstrumentKind::ObservableUpDownCounter
                | InstrumentKind::ObservableGauge
        )
    }
}

/// The numeric type of the measurements of an instrument.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ValueType {
    /// `i64` measurements
    Integer,
    /// `f64` measurements
    Double,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Integer => f.write_str("i64"),
            ValueType::Double => f.write_str("f64"),
        }
    }
}

/// The identity and metadata of a measurement stream.
///
/// Descriptors are plain values: two descriptors are equal when all of their
/// fields are.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstrumentDescriptor {
    /// The human-readable identifier of the stream.
    pub name: Cow<'static, str>,
    /// Describes the purpose of the stream.
    pub description: Cow<'static, str>,
    /// The unit of the recorded measurements.
    pub unit: Cow<'static, str>,
    /// The functional group of the instrument.
    pub kind: InstrumentKind,
    /// The numeric type of the recorded measurements.
    pub value_type: ValueType,
}

impl InstrumentDescriptor {
    /// Whether `other` describes the same stream identity.
    ///
    /// Names are compared ASCII case-insensitively, the description is not
    /// part of the identity.
    pub fn is_compatible_with(&self, other: &InstrumentDescriptor) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.kind == other.kind
            && self.value_type == other.value_type
            && self.unit == other.unit
    }

    /// Whether `other` has the same name but a different identity.
    pub fn conflicts_with(&self, other: &InstrumentDescriptor) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && !self.is_compatible_with(other)
    }
}

/// Optional metadata for [`create_instrument_descriptor`].
#[derive(Clone, Debug, Default)]
pub struct InstrumentOptions {
    /// Defaults to an empty description.
    pub description: Option<Cow<'static, str>>,
    /// Defaults to `"1"`.
    pub unit: Option<Cow<'static, str>>,
    /// Defaults to [`ValueType::Double`].
    pub value_type: Option<ValueType>,
}

/// Builds a descriptor, filling in the defaults for every option left out.
pub fn create_instrument_descriptor(
    name: impl Into<Cow<'static, str>>,
    kind: InstrumentKind,
    options: InstrumentOptions,
) -> InstrumentDescriptor {
    InstrumentDescriptor {
        name: name.into(),
        description: options.description.unwrap_or(Cow::Borrowed("")),
        unit: options.unit.unwrap_or(Cow::Borrowed("1")),
        kind,
        value_type: options.value_type.unwrap_or(ValueType::Double),
    }
}

/// Forwards synchronous measurements to the streams resolved for an
/// instrument.
pub(crate) trait SyncMeasure<T>: Send + Sync {
    fn measure(&self, value: T, attributes: &[KeyValue]);
}

struct NoopMeasure;

impl<T> SyncMeasure<T> for NoopMeasure {
    fn measure(&self, _value: T, _attributes: &[KeyValue]) {}
}

macro_rules! sync_instrument {
    ($(#[$attr:meta])* $name:ident, $method:ident, $checked:expr) => {
        $(#[$attr])*
        #[derive(Clone)]
        pub struct $name<T> {
            measure: Arc<dyn SyncMeasure<T>>,
        }

        impl<T> $name<T> {
            pub(crate) fn new(measure: Arc<dyn SyncMeasure<T>>) -> Self {
                $name { measure }
            }

            pub(crate) fn noop() -> Self {
                $name {
                    measure: Arc::new(NoopMeasure),
                }
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name)).finish_non_exhaustive()
            }
        }

        impl $name<i64> {
            /// Records a measurement with the given attributes.
            pub fn $method(&self, value: i64, attributes: &[KeyValue]) {
                if $checked && value < 0 {
                    otel_debug!(
                        name: "Counter.NegativeValueDropped",
                        instrument = stringify!($name),
                        value = value,
                    );
                    return;
                }
                self.measure.measure(value, attributes)
            }
        }

        impl $name<f64> {
            /// Records a measurement with the given attributes.
            pub fn $method(&self, value: f64, attributes: &[KeyValue]) {
                if $checked && (value < 0.0 || value.is_nan()) {
                    otel_debug!(
                        name: "Counter.NegativeValueDropped",
                        instrument = stringify!($name),
                        value = value,
                    );
                    return;
                }
                self.measure.measure(value, attributes)
            }
        }
    };
}

sync_instrument!(
    /// An instrument that records increasing values.
    ///
    /// Negative and NaN values are dropped.
    Counter,
    add,
    true
);

sync_instrument!(
    /// An instrument that records increasing or decreasing values.
    UpDownCounter,
    add,
    false
);

sync_instrument!(
    /// An instrument that records a distribution of values.
    Histogram,
    record,
    false
);

/// The error type observable callbacks may fail with.
pub type CallbackError = Box<dyn Error + Send + Sync>;

/// A callback reporting the current values of an observable instrument.
pub type Callback<T> = Box<dyn Fn(&Observer<T>) -> Result<(), CallbackError> + Send + Sync>;

/// Records the observations of one callback invocation.
///
/// Observations only reach the instrument's streams when the callback
/// returns successfully.
pub struct Observer<T> {
    observations: RefCell<Vec<(T, Vec<KeyValue>)>>,
}

impl<T> Observer<T> {
    pub(crate) fn new() -> Self {
        Observer {
            observations: RefCell::new(Vec::new()),
        }
    }

    /// Reports the current value for the given attributes.
    pub fn observe(&self, value: T, attributes: &[KeyValue]) {
        self.observations
            .borrow_mut()
            .push((value, attributes.to_vec()));
    }

    pub(crate) fn into_observations(self) -> Vec<(T, Vec<KeyValue>)> {
        self.observations.into_inner()
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("observations", &self.observations.borrow().len())
            .finish()
    }
}

macro_rules! observable_instrument {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        ///
        /// Values are reported by the callbacks registered on the builder; the
        /// handle itself carries no state.
        pub struct $name<T> {
            _marker: PhantomData<fn() -> T>,
        }

        impl<T> $name<T> {
            pub(crate) fn new() -> Self {
                $name {
                    _marker: PhantomData,
                }
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                $name::new()
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(stringify!($name))
            }
        }
    };
}

observable_instrument!(
    /// An instrument that reports increasing totals.
    ObservableCounter
);
observable_instrument!(
    /// An instrument that reports totals that may increase or decrease.
    ObservableUpDownCounter
);
observable_instrument!(
    /// An instrument that reports current values.
    ObservableGauge
);

/// Configuration for building a synchronous instrument.
pub struct InstrumentBuilder<'a, I> {
    pub(crate) meter: &'a Meter,
    pub(crate) name: Cow<'static, str>,
    pub(crate) description: Option<Cow<'static, str>>,
    pub(crate) unit: Option<Cow<'static, str>>,
    _marker: PhantomData<I>,
}

impl<'a, I> InstrumentBuilder<'a, I> {
    pub(crate) fn new(meter: &'a Meter, name: Cow<'static, str>) -> Self {
        InstrumentBuilder {
            meter,
            name,
            description: None,
            unit: None,
            _marker: PhantomData,
        }
    }

    /// Set the description for this instrument
    pub fn with_description<S: Into<Cow<'static, str>>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the unit for this instrument.
    ///
    /// Unit is case sensitive (`kb` is not the same as `kB`).
    pub fn with_unit<S: Into<Cow<'static, str>>>(mut self, unit: S) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

impl<I> fmt::Debug for InstrumentBuilder<'_, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentBuilder")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("unit", &self.unit)
            .field("kind", &std::any::type_name::<I>())
            .finish()
    }
}

/// Configuration for building a histogram.
pub struct HistogramBuilder<'a, T> {
    pub(crate) meter: &'a Meter,
    pub(crate) name: Cow<'static, str>,
    pub(crate) description: Option<Cow<'static, str>>,
    pub(crate) unit: Option<Cow<'static, str>>,
    pub(crate) boundaries: Option<Vec<f64>>,
    _marker: PhantomData<T>,
}

impl<'a, T> HistogramBuilder<'a, T> {
    pub(crate) fn new(meter: &'a Meter, name: Cow<'static, str>) -> Self {
        HistogramBuilder {
            meter,
            name,
            description: None,
            unit: None,
            boundaries: None,
            _marker: PhantomData,
        }
    }

    /// Set the description for this instrument
    pub fn with_description<S: Into<Cow<'static, str>>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the unit for this instrument.
    pub fn with_unit<S: Into<Cow<'static, str>>>(mut self, unit: S) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Set the bucket boundaries used when no view selects an aggregation.
    ///
    /// Boundaries must be strictly increasing and free of NaN, otherwise the
    /// default boundaries are used.
    pub fn with_boundaries(mut self, boundaries: Vec<f64>) -> Self {
        self.boundaries = Some(boundaries);
        self
    }
}

impl<T> fmt::Debug for HistogramBuilder<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistogramBuilder")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("unit", &self.unit)
            .field("boundaries", &self.boundaries)
            .finish()
    }
}

/// Configuration for building an observable instrument.
pub struct AsyncInstrumentBuilder<'a, I, M> {
    pub(crate) meter: &'a Meter,
    pub(crate) name: Cow<'static, str>,
    pub(crate) description: Option<Cow<'static, str>>,
    pub(crate) unit: Option<Cow<'static, str>>,
    pub(crate) callbacks: Vec<Callback<M>>,
    _inst: PhantomData<I>,
}

impl<'a, I, M> AsyncInstrumentBuilder<'a, I, M> {
    pub(crate) fn new(meter: &'a Meter, name: Cow<'static, str>) -> Self {
        AsyncInstrumentBuilder {
            meter,
            name,
            description: None,
            unit: None,
            callbacks: Vec::new(),
            _inst: PhantomData,
        }
    }

    /// Set the description for this instrument
    pub fn with_description<S: Into<Cow<'static, str>>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the unit for this instrument.
    pub fn with_unit<S: Into<Cow<'static, str>>>(mut self, unit: S) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Set a callback to be called for this instrument on every collection
    /// pass.
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Observer<M>) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(move |observer| {
            callback(observer);
            Ok(())
        }));
        self
    }

    /// Set a callback that may fail.
    ///
    /// When it returns an error the observations it made are discarded and
    /// the failure is logged.
    pub fn with_fallible_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Observer<M>) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
        self
    }
}

impl<I, M> fmt::Debug for AsyncInstrumentBuilder<'_, I, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncInstrumentBuilder")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("unit", &self.unit)
            .field("callbacks_len", &self.callbacks.len())
            .finish()
    }
}
