use std::{
    mem::replace,
    ops::DerefMut,
    sync::{Arc, Mutex},
    time::SystemTime,
};

use opentelemetry::KeyValue;

use crate::metrics::aggregation::Aggregation;
use crate::metrics::data::MetricPoints;
use crate::metrics::instrument::InstrumentKind;
use crate::metrics::Temporality;

use super::{
    histogram::Histogram, last_value::LastValue, precomputed_sum::PrecomputedSum, sum::Sum,
    Number,
};

pub(crate) struct AggregateTime {
    pub(crate) start: SystemTime,
    pub(crate) current: SystemTime,
}

/// Tracks the start of the current aggregation interval of a partition.
pub(crate) struct AggregateTimeInitiator(Mutex<SystemTime>);

impl AggregateTimeInitiator {
    pub(crate) fn new(start: SystemTime) -> Self {
        Self(Mutex::new(start))
    }

    /// Ends the current interval at `now` and starts the next one there.
    pub(crate) fn delta(&self, now: SystemTime) -> AggregateTime {
        let start_time = self
            .0
            .lock()
            .map(|mut start| replace(start.deref_mut(), now))
            .unwrap_or(now);
        AggregateTime {
            start: start_time,
            current: now,
        }
    }

    pub(crate) fn cumulative(&self, now: SystemTime) -> AggregateTime {
        let start_time = self.0.lock().map(|start| *start).unwrap_or(now);
        AggregateTime {
            start: start_time,
            current: now,
        }
    }

    pub(crate) fn for_temporality(&self, temporality: Temporality, now: SystemTime) -> AggregateTime {
        match temporality {
            Temporality::Delta => self.delta(now),
            Temporality::Cumulative => self.cumulative(now),
        }
    }
}

pub(crate) type Filter = Arc<dyn Fn(&KeyValue) -> bool + Send + Sync>;

/// Applies filter on provided attribute set
/// No-op, if filter is not set
#[derive(Clone)]
pub(crate) struct AttributeSetFilter {
    filter: Option<Filter>,
}

impl AttributeSetFilter {
    pub(crate) fn new(filter: Option<Filter>) -> Self {
        Self { filter }
    }

    pub(crate) fn apply(&self, attrs: &[KeyValue], run: impl FnOnce(&[KeyValue])) {
        if let Some(filter) = &self.filter {
            let filtered_attrs: Vec<KeyValue> =
                attrs.iter().filter(|kv| filter(kv)).cloned().collect();
            run(&filtered_attrs);
        } else {
            run(attrs);
        };
    }
}

/// The closed set of aggregations a partition can hold.
pub(crate) enum Aggregate<T: Number> {
    Sum(Sum<T>),
    PrecomputedSum(PrecomputedSum<T>),
    LastValue(LastValue<T>),
    Histogram(Histogram<T>),
}

impl<T: Number> Aggregate<T> {
    pub(crate) fn measure(&self, value: T, attrs: &[KeyValue]) {
        match self {
            Aggregate::Sum(sum) => sum.measure(value, attrs),
            Aggregate::PrecomputedSum(sum) => sum.measure(value, attrs),
            Aggregate::LastValue(last_value) => last_value.measure(value, attrs),
            Aggregate::Histogram(histogram) => histogram.measure(value, attrs),
        }
    }

    /// Produces the points accumulated since the previous call, or `None` when
    /// there are none.
    pub(crate) fn collect(&self, now: SystemTime) -> Option<MetricPoints<T>> {
        match self {
            Aggregate::Sum(sum) => sum.collect(now),
            Aggregate::PrecomputedSum(sum) => sum.collect(now),
            Aggregate::LastValue(last_value) => last_value.collect(now),
            Aggregate::Histogram(histogram) => histogram.collect(now),
        }
    }
}

/// Builds the aggregate of one partition.
pub(crate) struct AggregateBuilder {
    /// The temporality of the collector owning the partition.
    temporality: Temporality,

    /// Start of the first aggregation interval.
    start: SystemTime,
}

impl AggregateBuilder {
    pub(crate) fn new(temporality: Temporality, start: SystemTime) -> Self {
        AggregateBuilder { temporality, start }
    }

    /// Returns `None` for [`Aggregation::Drop`].
    pub(crate) fn build<T: Number>(
        &self,
        aggregation: &Aggregation,
        kind: InstrumentKind,
    ) -> Option<Aggregate<T>> {
        let monotonic = matches!(
            kind,
            InstrumentKind::Counter | InstrumentKind::Histogram | InstrumentKind::ObservableCounter
        );

        match aggregation {
            Aggregation::Drop => None,
            Aggregation::Default => self.build(&Aggregation::default_for(kind), kind),
            Aggregation::Sum => match kind {
                InstrumentKind::ObservableCounter
                | InstrumentKind::ObservableUpDownCounter
                | InstrumentKind::ObservableGauge => Some(Aggregate::PrecomputedSum(
                    PrecomputedSum::new(self.temporality, self.start, monotonic),
                )),
                InstrumentKind::Counter
                | InstrumentKind::UpDownCounter
                | InstrumentKind::Histogram => Some(Aggregate::Sum(Sum::new(
                    self.temporality,
                    self.start,
                    monotonic,
                ))),
            },
            Aggregation::LastValue => Some(Aggregate::LastValue(LastValue::new(
                self.temporality,
                self.start,
            ))),
            Aggregation::ExplicitBucketHistogram {
                boundaries,
                record_min_max,
            } => {
                // sums of up-down values are not meaningful for a histogram
                let record_sum = matches!(
                    kind,
                    InstrumentKind::Counter | InstrumentKind::Histogram
                );
                Some(Aggregate::Histogram(Histogram::new(
                    self.temporality,
                    self.start,
                    boundaries.clone(),
                    *record_min_max,
                    record_sum,
                )))
            }
        }
    }
}
