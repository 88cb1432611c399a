mod aggregate;
mod histogram;
mod last_value;
mod precomputed_sum;
mod sum;

use core::fmt;
use std::collections::HashMap;
use std::ops::{Add, AddAssign, Sub};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::RwLock;

use opentelemetry::KeyValue;

use crate::metrics::attribute_set::AttributeSet;
use crate::metrics::data::{AggregatedMetrics, MetricPoints};
use crate::metrics::instrument::ValueType;

pub(crate) use aggregate::{Aggregate, AggregateBuilder, AttributeSetFilter, Filter};

/// Aggregation state of one attribute set.
pub(crate) trait Aggregator: Send + Sync + 'static {
    /// Static configuration needed to create a new tracker, e.g. the bucket
    /// count of a histogram.
    type InitConfig: Send + Sync + 'static;

    /// The value handed to [`Aggregator::update`].
    type PreComputedValue;

    /// Called every time a new attribute set is stored.
    fn create(init: &Self::InitConfig) -> Self;

    /// Called for each measurement.
    fn update(&self, value: Self::PreComputedValue);

    /// Returns the current state and resets `self` to a fresh one.
    fn clone_and_reset(&self, init: &Self::InitConfig) -> Self;
}

/// Aggregation state per attribute set for one partition of a stream.
///
/// Lookups of known attribute sets only take the read lock, so concurrent
/// recordings of existing series never block each other.
pub(crate) struct ValueMap<A: Aggregator> {
    trackers: RwLock<HashMap<AttributeSet, A>>,
    config: A::InitConfig,
}

impl<A: Aggregator> ValueMap<A> {
    pub(crate) fn new(config: A::InitConfig) -> Self {
        ValueMap {
            trackers: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub(crate) fn measure(&self, value: A::PreComputedValue, attributes: &[KeyValue]) {
        let attrs = AttributeSet::from(attributes);

        let Ok(trackers) = self.trackers.read() else {
            return;
        };
        if let Some(tracker) = trackers.get(&attrs) {
            tracker.update(value);
            return;
        }
        drop(trackers);

        let Ok(mut trackers) = self.trackers.write() else {
            return;
        };
        // another thread may have inserted the set in the meantime
        trackers
            .entry(attrs)
            .or_insert_with(|| A::create(&self.config))
            .update(value);
    }

    /// Maps every tracker without touching its state.
    pub(crate) fn collect_readonly<Res, MapFn>(&self, dest: &mut Vec<Res>, mut map_fn: MapFn)
    where
        MapFn: FnMut(&AttributeSet, &A) -> Res,
    {
        let Ok(trackers) = self.trackers.read() else {
            return;
        };
        prepare_data(dest, trackers.len());
        dest.extend(trackers.iter().map(|(attrs, tracker)| map_fn(attrs, tracker)));
    }

    /// Maps every tracker and resets it, keeping the attribute sets known.
    pub(crate) fn collect_and_reset<Res, MapFn>(&self, dest: &mut Vec<Res>, mut map_fn: MapFn)
    where
        MapFn: FnMut(&AttributeSet, A) -> Res,
    {
        let Ok(trackers) = self.trackers.read() else {
            return;
        };
        prepare_data(dest, trackers.len());
        dest.extend(
            trackers
                .iter()
                .map(|(attrs, tracker)| map_fn(attrs, tracker.clone_and_reset(&self.config))),
        );
    }

    /// Maps every tracker and forgets all attribute sets.
    pub(crate) fn drain<Res, MapFn>(&self, dest: &mut Vec<Res>, mut map_fn: MapFn)
    where
        MapFn: FnMut(AttributeSet, A) -> Res,
    {
        let Ok(mut trackers) = self.trackers.write() else {
            return;
        };
        prepare_data(dest, trackers.len());
        dest.extend(trackers.drain().map(|(attrs, tracker)| map_fn(attrs, tracker)));
    }
}

/// Clear and allocate exactly required amount of space for all attribute sets
fn prepare_data<T>(data: &mut Vec<T>, list_len: usize) {
    data.clear();
    if list_len > data.capacity() {
        data.reserve_exact(list_len - data.capacity());
    }
}

/// Marks a type that can have a value added and retrieved atomically. Required since
/// different types have different backing atomic mechanisms
pub(crate) trait AtomicTracker<T>: Sync + Send + 'static {
    fn store(&self, value: T);
    fn add(&self, value: T);
    fn get_value(&self) -> T;
    fn get_and_reset_value(&self) -> T;
}

/// Marks a type that can have an atomic tracker generated for it
pub(crate) trait AtomicallyUpdate<T> {
    type AtomicTracker: AtomicTracker<T>;
    fn new_atomic_tracker(init: T) -> Self::AtomicTracker;
}

pub(crate) trait Number:
    Add<Output = Self>
    + AddAssign
    + Sub<Output = Self>
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Clone
    + Copy
    + PartialEq
    + Default
    + Send
    + Sync
    + 'static
    + AtomicallyUpdate<Self>
{
    const VALUE_TYPE: ValueType;

    fn min() -> Self;
    fn max() -> Self;

    fn into_float(self) -> f64;

    /// Addition that never panics; integers saturate.
    fn saturating_add(self, other: Self) -> Self;

    /// Subtraction that never panics; integers wrap.
    fn wrapping_sub(self, other: Self) -> Self;

    /// Wraps typed points into the value-type erased form.
    fn into_aggregated(points: MetricPoints<Self>) -> AggregatedMetrics;
}

impl Number for i64 {
    const VALUE_TYPE: ValueType = ValueType::Integer;

    fn min() -> Self {
        i64::MIN
    }

    fn max() -> Self {
        i64::MAX
    }

    fn into_float(self) -> f64 {
        // May have precision loss at high values
        self as f64
    }

    fn saturating_add(self, other: Self) -> Self {
        i64::saturating_add(self, other)
    }

    fn wrapping_sub(self, other: Self) -> Self {
        i64::wrapping_sub(self, other)
    }

    fn into_aggregated(points: MetricPoints<Self>) -> AggregatedMetrics {
        AggregatedMetrics::I64(points)
    }
}

impl Number for f64 {
    const VALUE_TYPE: ValueType = ValueType::Double;

    fn min() -> Self {
        f64::MIN
    }

    fn max() -> Self {
        f64::MAX
    }

    fn into_float(self) -> f64 {
        self
    }

    fn saturating_add(self, other: Self) -> Self {
        self + other
    }

    fn wrapping_sub(self, other: Self) -> Self {
        self - other
    }

    fn into_aggregated(points: MetricPoints<Self>) -> AggregatedMetrics {
        AggregatedMetrics::F64(points)
    }
}

impl AtomicTracker<i64> for AtomicI64 {
    fn store(&self, value: i64) {
        self.store(value, Ordering::Relaxed);
    }

    fn add(&self, value: i64) {
        self.fetch_add(value, Ordering::Relaxed);
    }

    fn get_value(&self) -> i64 {
        self.load(Ordering::Relaxed)
    }

    fn get_and_reset_value(&self) -> i64 {
        self.swap(0, Ordering::Relaxed)
    }
}

impl AtomicallyUpdate<i64> for i64 {
    type AtomicTracker = AtomicI64;

    fn new_atomic_tracker(init: i64) -> Self::AtomicTracker {
        AtomicI64::new(init)
    }
}

/// `f64` cell updated by compare-and-swap on its bit pattern.
pub(crate) struct F64AtomicTracker {
    inner: AtomicU64,
}

impl F64AtomicTracker {
    fn new(init: f64) -> Self {
        F64AtomicTracker {
            inner: AtomicU64::new(init.to_bits()),
        }
    }
}

impl AtomicTracker<f64> for F64AtomicTracker {
    fn store(&self, value: f64) {
        self.inner.store(value.to_bits(), Ordering::Relaxed);
    }

    fn add(&self, value: f64) {
        let mut current = self.inner.load(Ordering::Relaxed);
        loop {
            let new = (f64::from_bits(current) + value).to_bits();
            match self.inner.compare_exchange_weak(
                current,
                new,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    fn get_value(&self) -> f64 {
        f64::from_bits(self.inner.load(Ordering::Relaxed))
    }

    fn get_and_reset_value(&self) -> f64 {
        f64::from_bits(self.inner.swap(0.0_f64.to_bits(), Ordering::Relaxed))
    }
}

impl AtomicallyUpdate<f64> for f64 {
    type AtomicTracker = F64AtomicTracker;

    fn new_atomic_tracker(init: f64) -> Self::AtomicTracker {
        F64AtomicTracker::new(init)
    }
}
