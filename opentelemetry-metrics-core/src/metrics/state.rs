use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use opentelemetry::InstrumentationScope;

use super::collector::CollectorHandle;
use super::error::MetricResult;
use super::meter::SdkMeter;
use super::view::View;
use super::Temporality;
use crate::Resource;

/// Provider-wide registry of meters and collectors.
///
/// Locks are always taken in the order collectors, meters, a meter's
/// instruments, a stream's partitions.
pub(crate) struct MeterProviderSharedState {
    resource: Resource,
    views: Vec<Arc<View>>,
    meters: RwLock<Meters>,
    collectors: RwLock<Vec<CollectorHandle>>,
}

#[derive(Default)]
struct Meters {
    /// In creation order, which is also export order.
    list: Vec<Arc<SdkMeter>>,
    by_scope: HashMap<InstrumentationScope, usize>,
}

impl MeterProviderSharedState {
    pub(crate) fn new(resource: Resource, views: Vec<Arc<View>>) -> Arc<Self> {
        Arc::new(MeterProviderSharedState {
            resource,
            views,
            meters: RwLock::new(Meters::default()),
            collectors: RwLock::new(Vec::new()),
        })
    }

    pub(crate) fn views(&self) -> &[Arc<View>] {
        &self.views
    }

    pub(crate) fn collectors(&self) -> &RwLock<Vec<CollectorHandle>> {
        &self.collectors
    }

    /// Returns the meter for `scope`, creating it on first use.
    pub(crate) fn meter(self: &Arc<Self>, scope: InstrumentationScope) -> MetricResult<Arc<SdkMeter>> {
        if let Some(meter) = self.existing_meter(&scope)? {
            otel_debug!(
                name: "MeterProvider.ExistingMeterReturned",
                meter_name = scope.name(),
            );
            return Ok(meter);
        }

        let mut meters = self.meters.write()?;
        // another thread may have created it in the meantime
        if let Some(&index) = meters.by_scope.get(&scope) {
            return Ok(Arc::clone(&meters.list[index]));
        }

        otel_debug!(
            name: "MeterProvider.NewMeterCreated",
            meter_name = scope.name(),
        );
        let meter = Arc::new(SdkMeter::new(
            scope.clone(),
            self.resource.clone(),
            Arc::downgrade(self),
        ));
        let index = meters.list.len();
        meters.list.push(Arc::clone(&meter));
        meters.by_scope.insert(scope, index);
        Ok(meter)
    }

    fn existing_meter(&self, scope: &InstrumentationScope) -> MetricResult<Option<Arc<SdkMeter>>> {
        let meters = self.meters.read()?;
        Ok(meters
            .by_scope
            .get(scope)
            .map(|&index| Arc::clone(&meters.list[index])))
    }

    /// Snapshot of all meters in creation order.
    pub(crate) fn meters(&self) -> MetricResult<Vec<Arc<SdkMeter>>> {
        Ok(self.meters.read()?.list.clone())
    }

    /// Assigns the next collector id and gives it a fresh partition in every
    /// existing stream.
    pub(crate) fn register_collector(&self, temporality: Temporality) -> MetricResult<CollectorHandle> {
        let mut collectors = self.collectors.write()?;
        let handle = CollectorHandle::new(collectors.len(), temporality);

        let meters = self.meters.read()?;
        for meter in &meters.list {
            meter.add_partitions(&handle)?;
        }
        collectors.push(handle);

        Ok(handle)
    }
}

impl fmt::Debug for MeterProviderSharedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeterProviderSharedState")
            .field("resource", &self.resource)
            .field("views", &self.views)
            .finish()
    }
}
