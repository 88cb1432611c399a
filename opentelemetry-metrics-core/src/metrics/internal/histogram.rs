use std::mem::replace;
use std::ops::DerefMut;
use std::sync::Mutex;
use std::time::SystemTime;

use opentelemetry::KeyValue;

use crate::metrics::data::{self, HistogramDataPoint, MetricPoints};
use crate::metrics::Temporality;

use super::aggregate::AggregateTimeInitiator;
use super::{Aggregator, Number, ValueMap};

struct HistogramTracker<T> {
    buckets: Mutex<Buckets<T>>,
}

impl<T: Number> Aggregator for HistogramTracker<T> {
    type InitConfig = usize;
    /// Value and bucket index
    type PreComputedValue = (T, usize);

    fn create(count: &usize) -> Self {
        HistogramTracker {
            buckets: Mutex::new(Buckets::<T>::new(*count)),
        }
    }

    fn update(&self, (value, index): (T, usize)) {
        let mut buckets = self.buckets.lock().unwrap_or_else(|err| err.into_inner());

        buckets.bin(index, value);
        buckets.sum(value);
    }

    fn clone_and_reset(&self, count: &usize) -> Self {
        let mut current = self.buckets.lock().unwrap_or_else(|err| err.into_inner());
        let cloned = replace(current.deref_mut(), Buckets::new(*count));
        Self {
            buckets: Mutex::new(cloned),
        }
    }
}

#[derive(Default, Clone)]
struct Buckets<T> {
    counts: Vec<u64>,
    count: u64,
    total: T,
    min: T,
    max: T,
}

impl<T: Number> Buckets<T> {
    /// returns buckets with `n` bins.
    fn new(n: usize) -> Buckets<T> {
        Buckets {
            counts: vec![0; n],
            min: T::max(),
            max: T::min(),
            ..Default::default()
        }
    }

    fn sum(&mut self, value: T) {
        self.total = self.total.saturating_add(value);
    }

    fn bin(&mut self, idx: usize, value: T) {
        self.counts[idx] += 1;
        self.count += 1;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value
        }
    }
}

/// Summarizes a set of measurements as a histogram with explicitly defined
/// buckets.
pub(crate) struct Histogram<T: Number> {
    value_map: ValueMap<HistogramTracker<T>>,
    init_time: AggregateTimeInitiator,
    temporality: Temporality,
    bounds: Vec<f64>,
    record_min_max: bool,
    record_sum: bool,
}

impl<T: Number> Histogram<T> {
    pub(crate) fn new(
        temporality: Temporality,
        start: SystemTime,
        mut bounds: Vec<f64>,
        record_min_max: bool,
        record_sum: bool,
    ) -> Self {
        bounds.retain(|v| !v.is_nan());
        bounds.sort_by(|a, b| a.total_cmp(b));
        let buckets_count = bounds.len() + 1;

        Histogram {
            value_map: ValueMap::new(buckets_count),
            init_time: AggregateTimeInitiator::new(start),
            temporality,
            bounds,
            record_min_max,
            record_sum,
        }
    }

    pub(crate) fn measure(&self, measurement: T, attrs: &[KeyValue]) {
        let f = measurement.into_float();
        if f.is_nan() {
            return;
        }
        // Index in `[0, bounds.len()]`; `bounds.len()` is the overflow bucket
        // `(bounds[bounds.len()-1], +∞)`.
        let index = self.bounds.partition_point(|&x| x < f);

        self.value_map.measure((measurement, index), attrs);
    }

    pub(crate) fn collect(&self, now: SystemTime) -> Option<MetricPoints<T>> {
        let time = self.init_time.for_temporality(self.temporality, now);
        let mut data_points = vec![];

        match self.temporality {
            Temporality::Delta => self.value_map.drain(&mut data_points, |attributes, aggr| {
                let b = aggr
                    .buckets
                    .into_inner()
                    .unwrap_or_else(|err| err.into_inner());
                self.data_point(attributes.into_vec(), b)
            }),
            Temporality::Cumulative => {
                self.value_map
                    .collect_readonly(&mut data_points, |attributes, aggr| {
                        let b = aggr
                            .buckets
                            .lock()
                            .map(|b| b.clone())
                            .unwrap_or_else(|err| err.into_inner().clone());
                        self.data_point(attributes.to_vec(), b)
                    })
            }
        }

        if data_points.is_empty() {
            return None;
        }

        Some(
            data::Histogram {
                data_points,
                start_time: time.start,
                time: time.current,
                temporality: self.temporality,
            }
            .into(),
        )
    }

    fn data_point(&self, attributes: Vec<KeyValue>, b: Buckets<T>) -> HistogramDataPoint<T> {
        HistogramDataPoint {
            attributes,
            count: b.count,
            bounds: self.bounds.clone(),
            bucket_counts: b.counts,
            sum: if self.record_sum {
                b.total
            } else {
                T::default()
            },
            min: if self.record_min_max {
                Some(b.min)
            } else {
                None
            },
            max: if self.record_min_max {
                Some(b.max)
            } else {
                None
            },
        }
    }
}
