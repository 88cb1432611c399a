//! Interfaces for reading metrics
use std::{fmt, sync::Weak};

use async_trait::async_trait;

use super::{MetricCollector, MetricResult, Temporality};

/// The interface used between the metrics core and an export destination.
///
/// Control flow is bi-directional through the `MetricReader`: the provider
/// initiates `force_flush` and `shutdown`, while the reader initiates
/// collection through the [`MetricCollector`] handed to
/// [`MetricReader::register_collector`]. The reader owns its export cadence.
///
/// Pull-based readers call [`MetricCollector::collect`] on demand, see
/// [`ManualReader`](super::ManualReader).
#[async_trait]
pub trait MetricReader: fmt::Debug + Send + Sync + 'static {
    /// Hands the reader its collector.
    ///
    /// Called once, right after the reader is registered with a provider.
    fn register_collector(&self, collector: Weak<MetricCollector>);

    /// The aggregation temporality this reader wants.
    ///
    /// Queried once when the reader is registered; the answer stays fixed for
    /// the lifetime of its collector.
    fn temporality(&self) -> Temporality;

    /// Flushes all metric measurements held by the reader.
    async fn force_flush(&self) -> MetricResult<()>;

    /// Flushes and releases any held resources.
    ///
    /// After `shutdown` the reader must not collect anymore.
    async fn shutdown(&self) -> MetricResult<()>;
}
