use std::time::SystemTime;

use opentelemetry::KeyValue;

use crate::metrics::data::{self, MetricPoints, SumDataPoint};
use crate::metrics::Temporality;

use super::aggregate::AggregateTimeInitiator;
use super::{Aggregator, AtomicTracker, AtomicallyUpdate, Number, ValueMap};

struct Increment<T: Number> {
    value: <T as AtomicallyUpdate<T>>::AtomicTracker,
}

impl<T: Number> Aggregator for Increment<T> {
    type InitConfig = ();
    type PreComputedValue = T;

    fn create(_init: &()) -> Self {
        Self {
            value: T::new_atomic_tracker(T::default()),
        }
    }

    fn update(&self, value: T) {
        self.value.add(value)
    }

    fn clone_and_reset(&self, _: &()) -> Self {
        Self {
            value: T::new_atomic_tracker(self.value.get_and_reset_value()),
        }
    }
}

/// Summarizes a set of measurements made as their arithmetic sum.
///
/// Delta collection resets every known series to zero instead of forgetting
/// it, so a series that saw no recordings is reported with value `0`.
pub(crate) struct Sum<T: Number> {
    value_map: ValueMap<Increment<T>>,
    init_time: AggregateTimeInitiator,
    temporality: Temporality,
    monotonic: bool,
}

impl<T: Number> Sum<T> {
    pub(crate) fn new(temporality: Temporality, start: SystemTime, monotonic: bool) -> Self {
        Sum {
            value_map: ValueMap::new(()),
            init_time: AggregateTimeInitiator::new(start),
            temporality,
            monotonic,
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
                self.value_map
                    .collect_and_reset(&mut data_points, |attributes, aggr| SumDataPoint {
                        attributes: attributes.to_vec(),
                        value: aggr.value.get_value(),
                    })
            }
            Temporality::Cumulative => {
                self.value_map
                    .collect_readonly(&mut data_points, |attributes, aggr| SumDataPoint {
                        attributes: attributes.to_vec(),
                        value: aggr.value.get_value(),
                    })
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
