use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;

use opentelemetry::KeyValue;

use crate::metrics::attribute_set::AttributeSet;
use crate::metrics::data::{self, MetricPoints, SumDataPoint};
use crate::metrics::Temporality;

use super::aggregate::AggregateTimeInitiator;
use super::{Aggregator, AtomicTracker, AtomicallyUpdate, Number, ValueMap};

pub(crate) struct Assign<T: Number> {
    value: <T as AtomicallyUpdate<T>>::AtomicTracker,
}

impl<T: Number> Aggregator for Assign<T> {
    type InitConfig = ();
    type PreComputedValue = T;

    fn create(_init: &()) -> Self {
        Self {
            value: T::new_atomic_tracker(T::default()),
        }
    }

    fn update(&self, value: T) {
        self.value.store(value)
    }

    fn clone_and_reset(&self, _: &()) -> Self {
        Self {
            value: T::new_atomic_tracker(self.value.get_and_reset_value()),
        }
    }
}

impl<T: Number> Assign<T> {
    pub(crate) fn value(&self) -> T {
        self.value.get_value()
    }
}

/// Summarizes a set of pre-computed sums as their arithmetic sum.
///
/// Callbacks report absolute values on every pass, so the observed series are
/// forgotten after each collection. Delta values are derived from the value
/// last reported for the same attribute set, which survives passes where the
/// series was not observed.
pub(crate) struct PrecomputedSum<T: Number> {
    value_map: ValueMap<Assign<T>>,
    init_time: AggregateTimeInitiator,
    temporality: Temporality,
    monotonic: bool,
    reported: Mutex<HashMap<AttributeSet, T>>,
}

impl<T: Number> PrecomputedSum<T> {
    pub(crate) fn new(temporality: Temporality, start: SystemTime, monotonic: bool) -> Self {
        PrecomputedSum {
            value_map: ValueMap::new(()),
            init_time: AggregateTimeInitiator::new(start),
            temporality,
            monotonic,
            reported: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn measure(&self, measurement: T, attrs: &[KeyValue]) {
        self.value_map.measure(measurement, attrs)
    }

    pub(crate) fn collect(&self, now: SystemTime) -> Option<MetricPoints<T>> {
        let time = self.init_time.for_temporality(self.temporality, now);
        let mut data_points = vec![];

        match self.temporality {
            Temporality::Delta => {
                let Ok(mut reported) = self.reported.lock() else {
                    return None;
                };
                // series missing from this pass keep their baseline
                self.value_map.drain(&mut data_points, |attributes, aggr| {
                    let curr_value = aggr.value();
                    let prev_value = reported
                        .insert(attributes.clone(), curr_value)
                        .unwrap_or_default();
                    SumDataPoint {
                        attributes: attributes.into_vec(),
                        value: curr_value.wrapping_sub(prev_value),
                    }
                });
            }
            Temporality::Cumulative => {
                self.value_map.drain(&mut data_points, |attributes, aggr| SumDataPoint {
                    attributes: attributes.into_vec(),
                    value: aggr.value(),
                });
            }
        }

        if data_points.is_empty() {
            return None;
        }

        Some(
            data::Sum {
                data_points,
                start_time: time.start,
                time: time.current,
                temporality: self.temporality,
                is_monotonic: self.monotonic,
            }
            .into(),
        )
    }
}
