//! Types for delivery of aggregated metric time series data.

use std::time::SystemTime;

use opentelemetry::{InstrumentationScope, KeyValue};

use crate::metrics::instrument::InstrumentDescriptor;
use crate::Resource;

use super::Temporality;

/// One stream's snapshot, produced by a single collection pass for a single
/// collector.
#[derive(Debug, Clone)]
pub struct MetricData {
    /// The effective descriptor of the stream, after view overrides.
    pub descriptor: InstrumentDescriptor,
    /// The entity that produced the measurements.
    pub resource: Resource,
    /// The scope of the meter that owns the stream.
    pub scope: InstrumentationScope,
    /// The temporality of the collector this snapshot was produced for.
    pub temporality: Temporality,
    /// The aggregated points.
    pub data: AggregatedMetrics,
}

impl MetricData {
    /// The name of the stream.
    pub fn name(&self) -> &str {
        self.descriptor.name.as_ref()
    }
}

/// Aggregated points of a stream, by measurement value type.
#[derive(Debug, Clone)]
pub enum AggregatedMetrics {
    /// Points of an `f64` stream
    F64(MetricPoints<f64>),
    /// Points of an `i64` stream
    I64(MetricPoints<i64>),
}

/// Aggregated points of a stream, by aggregation.
#[derive(Debug, Clone)]
pub enum MetricPoints<T> {
    /// Points of a last value aggregation
    Gauge(Gauge<T>),
    /// Points of a sum aggregation
    Sum(Sum<T>),
    /// Points of an explicit bucket histogram aggregation
    Histogram(Histogram<T>),
}

impl From<MetricPoints<f64>> for AggregatedMetrics {
    fn from(value: MetricPoints<f64>) -> Self {
        AggregatedMetrics::F64(value)
    }
}

impl From<MetricPoints<i64>> for AggregatedMetrics {
    fn from(value: MetricPoints<i64>) -> Self {
        AggregatedMetrics::I64(value)
    }
}

impl<T> From<Gauge<T>> for MetricPoints<T> {
    fn from(value: Gauge<T>) -> Self {
        MetricPoints::Gauge(value)
    }
}

impl<T> From<Sum<T>> for MetricPoints<T> {
    fn from(value: Sum<T>) -> Self {
        MetricPoints::Sum(value)
    }
}

impl<T> From<Histogram<T>> for MetricPoints<T> {
    fn from(value: Histogram<T>) -> Self {
        MetricPoints::Histogram(value)
    }
}

/// A single gauge data point in a time series.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeDataPoint<T> {
    /// The set of key value pairs that uniquely identify the time series.
    pub attributes: Vec<KeyValue>,
    /// The value of this data point.
    pub value: T,
}

/// A measurement of the current value of an instrument.
#[derive(Debug, Clone)]
pub struct Gauge<T> {
    /// Represents individual aggregated measurements with unique attributes.
    pub data_points: Vec<GaugeDataPoint<T>>,
    /// The time when the time series was started.
    pub start_time: Option<SystemTime>,
    /// The time when the time series was recorded.
    pub time: SystemTime,
}

/// A single sum data point in a time series.
#[derive(Debug, Clone, PartialEq)]
pub struct SumDataPoint<T> {
    /// The set of key value pairs that uniquely identify the time series.
    pub attributes: Vec<KeyValue>,
    /// The value of this data point.
    pub value: T,
}

/// Represents the sum of all measurements of values from an instrument.
#[derive(Debug, Clone)]
pub struct Sum<T> {
    /// Represents individual aggregated measurements with unique attributes.
    pub data_points: Vec<SumDataPoint<T>>,
    /// The time when the time series was started.
    pub start_time: SystemTime,
    /// The time when the time series was recorded.
    pub time: SystemTime,
    /// Describes if the aggregation is reported as the change from the last report
    /// time, or the cumulative changes since a fixed start time.
    pub temporality: Temporality,
    /// Whether this aggregation only increases.
    pub is_monotonic: bool,
}

/// Represents the histogram of all measurements of values from an instrument.
#[derive(Debug, Clone)]
pub struct Histogram<T> {
    /// Individual aggregated measurements with unique attributes.
    pub data_points: Vec<HistogramDataPoint<T>>,
    /// The time when the time series was started.
    pub start_time: SystemTime,
    /// The time when the time series was recorded.
    pub time: SystemTime,
    /// Describes if the aggregation is reported as the change from the last report
    /// time, or the cumulative changes since a fixed start time.
    pub temporality: Temporality,
}

/// A single histogram data point in a time series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramDataPoint<T> {
    /// The set of key value pairs that uniquely identify the time series.
    pub attributes: Vec<KeyValue>,
    /// The number of updates this histogram has been calculated with.
    pub count: u64,
    /// The upper bounds of the buckets of the histogram.
    ///
    /// Because the last boundary is +infinity this one is implied.
    pub bounds: Vec<f64>,
    /// The count of each of the buckets.
    pub bucket_counts: Vec<u64>,
    /// The minimum value recorded.
    pub min: Option<T>,
    /// The maximum value recorded.
    pub max: Option<T>,
    /// The sum of the values recorded.
    pub sum: T,
}
