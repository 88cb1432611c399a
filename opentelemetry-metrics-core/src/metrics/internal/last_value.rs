use std::time::SystemTime;

use opentelemetry::KeyValue;

use crate::metrics::data::{self, GaugeDataPoint, MetricPoints};
use crate::metrics::Temporality;

use super::aggregate::AggregateTimeInitiator;
use super::precomputed_sum::Assign;
use super::{Number, ValueMap};

/// Summarizes a set of measurements as the last one made.
pub(crate) struct LastValue<T: Number> {
    value_map: ValueMap<Assign<T>>,
    init_time: AggregateTimeInitiator,
    temporality: Temporality,
}

impl<T: Number> LastValue<T> {
    pub(crate) fn new(temporality: Temporality, start: SystemTime) -> Self {
        LastValue {
            value_map: ValueMap::new(()),
            init_time: AggregateTimeInitiator::new(start),
            temporality,
        }
    }

    pub(crate) fn measure(&self, measurement: T, attrs: &[KeyValue]) {
        self.value_map.measure(measurement, attrs)
    }

    pub(crate) fn collect(&self, now: SystemTime) -> Option<MetricPoints<T>> {
        let time = self.init_time.for_temporality(self.temporality, now);
        let mut data_points = vec![];

        self.value_map
            .drain(&mut data_points, |attributes, aggr| GaugeDataPoint {
                attributes: attributes.into_vec(),
                value: aggr.value(),
            });

        if data_points.is_empty() {
            return None;
        }

        Some(
            data::Gauge {
                data_points,
                start_time: Some(time.start),
                time: time.current,
            }
            .into(),
        )
    }
}
