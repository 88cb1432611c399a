use std::any::Any;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use opentelemetry::KeyValue;

use crate::metrics::aggregation::Aggregation;
use crate::metrics::collector::CollectorHandle;
use crate::metrics::data::AggregatedMetrics;
use crate::metrics::error::{MetricError, MetricResult};
use crate::metrics::instrument::{InstrumentDescriptor, SyncMeasure};
use crate::metrics::internal::{Aggregate, AggregateBuilder, AttributeSetFilter, Filter, Number};

/// Value-type erased view of a [`MetricStorage`], used by the meter to collect
/// and to grow partitions when a collector registers.
pub(crate) trait Storage: Send + Sync + 'static {
    fn descriptor(&self) -> &InstrumentDescriptor;

    fn aggregation(&self) -> &Aggregation;

    /// Adds a fresh partition for a newly registered collector.
    fn add_partition(&self, collector: &CollectorHandle) -> MetricResult<()>;

    /// Collects the partition of `collector`.
    fn collect(
        &self,
        collector: &CollectorHandle,
        now: SystemTime,
    ) -> MetricResult<Option<AggregatedMetrics>>;

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// The aggregation state of one effective stream.
///
/// Holds one partition per registered collector, indexed by collector id, so
/// collecting (and resetting) one collector's partition never touches another.
pub(crate) struct MetricStorage<T: Number> {
    descriptor: InstrumentDescriptor,
    aggregation: Aggregation,
    filter: AttributeSetFilter,
    partitions: RwLock<Vec<Aggregate<T>>>,
}

impl<T: Number> MetricStorage<T> {
    /// Creates the storage with an empty partition for each of `collectors`.
    pub(crate) fn new(
        descriptor: InstrumentDescriptor,
        aggregation: Aggregation,
        filter: Option<Filter>,
        collectors: &[CollectorHandle],
    ) -> MetricResult<Self> {
        let now = SystemTime::now();
        let partitions = collectors
            .iter()
            .map(|c| {
                AggregateBuilder::new(c.temporality, now)
                    .build(&aggregation, descriptor.kind)
                    .ok_or_else(|| {
                        MetricError::Config(format!(
                            "aggregation {aggregation} produces no stream for {}",
                            descriptor.name
                        ))
                    })
            })
            .collect::<MetricResult<Vec<_>>>()?;

        Ok(MetricStorage {
            descriptor,
            aggregation,
            filter: AttributeSetFilter::new(filter),
            partitions: RwLock::new(partitions),
        })
    }

    /// Records into every partition.
    pub(crate) fn measure(&self, value: T, attrs: &[KeyValue]) {
        let Ok(partitions) = self.partitions.read() else {
            return;
        };
        self.filter.apply(attrs, |attrs| {
            for partition in partitions.iter() {
                partition.measure(value, attrs);
            }
        });
    }

    /// Records into the partition of `collector` only.
    pub(crate) fn measure_for(&self, collector: &CollectorHandle, value: T, attrs: &[KeyValue]) {
        let Ok(partitions) = self.partitions.read() else {
            return;
        };
        if let Some(partition) = partitions.get(collector.id) {
            self.filter
                .apply(attrs, |attrs| partition.measure(value, attrs));
        }
    }
}

impl<T: Number> Storage for MetricStorage<T> {
    fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    fn aggregation(&self) -> &Aggregation {
        &self.aggregation
    }

    fn add_partition(&self, collector: &CollectorHandle) -> MetricResult<()> {
        let mut partitions = self.partitions.write()?;
        if partitions.len() != collector.id {
            return Err(MetricError::Other(format!(
                "stream {} has {} partitions, cannot add one for collector {}",
                self.descriptor.name,
                partitions.len(),
                collector.id
            )));
        }
        let aggregate = AggregateBuilder::new(collector.temporality, SystemTime::now())
            .build(&self.aggregation, self.descriptor.kind)
            .ok_or_else(|| {
                MetricError::Config(format!(
                    "aggregation {} produces no stream for {}",
                    self.aggregation, self.descriptor.name
                ))
            })?;
        partitions.push(aggregate);
        Ok(())
    }

    fn collect(
        &self,
        collector: &CollectorHandle,
        now: SystemTime,
    ) -> MetricResult<Option<AggregatedMetrics>> {
        let partitions = self.partitions.read()?;
        let partition = partitions.get(collector.id).ok_or_else(|| {
            MetricError::Other(format!(
                "stream {} has no partition for collector {}",
                self.descriptor.name, collector.id
            ))
        })?;

        Ok(partition.collect(now).map(T::into_aggregated))
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// The streams a synchronous instrument records into.
pub(crate) struct ResolvedMeasures<T: Number> {
    pub(crate) measures: Vec<Arc<MetricStorage<T>>>,
}

impl<T: Number> SyncMeasure<T> for ResolvedMeasures<T> {
    fn measure(&self, value: T, attrs: &[KeyValue]) {
        for measure in &self.measures {
            measure.measure(value, attrs)
        }
    }
}
