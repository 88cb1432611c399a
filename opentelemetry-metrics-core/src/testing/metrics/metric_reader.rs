use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;

use crate::metrics::data::MetricData;
use crate::metrics::{MetricCollector, MetricError, MetricReader, MetricResult, Temporality};

/// A reader that records the lifecycle calls it receives.
///
/// Clones share their state, so a clone can be handed to the provider and the
/// original inspected afterwards.
#[derive(Debug, Clone)]
pub struct TestMetricReader {
    state: Arc<Mutex<ReaderState>>,
    temporality: Temporality,
}

#[derive(Debug, Default)]
struct ReaderState {
    collector: Option<Weak<MetricCollector>>,
    is_shutdown: bool,
    flush_count: usize,
}

impl TestMetricReader {
    /// A cumulative reader.
    pub fn new() -> Self {
        Self::with_temporality(Temporality::Cumulative)
    }

    /// A reader asking for `temporality`.
    pub fn with_temporality(temporality: Temporality) -> Self {
        TestMetricReader {
            state: Arc::new(Mutex::new(ReaderState::default())),
            temporality,
        }
    }

    /// Whether `shutdown` was called.
    pub fn is_shutdown(&self) -> bool {
        self.state.lock().map(|s| s.is_shutdown).unwrap_or(false)
    }

    /// How many times `force_flush` was called.
    pub fn flush_count(&self) -> usize {
        self.state.lock().map(|s| s.flush_count).unwrap_or(0)
    }

    /// Marks the reader as shut down without going through the provider, so
    /// the provider's own shutdown of it fails.
    pub fn shutdown_now(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.is_shutdown = true;
        }
    }

    /// Collects through the registered collector.
    pub async fn collect(&self) -> MetricResult<Vec<MetricData>> {
        let collector = self
            .state
            .lock()?
            .collector
            .as_ref()
            .and_then(Weak::upgrade);
        match collector {
            Some(collector) => collector.collect().await,
            None => Err(MetricError::Other("reader is not registered".into())),
        }
    }
}

impl Default for TestMetricReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricReader for TestMetricReader {
    fn register_collector(&self, collector: Weak<MetricCollector>) {
        if let Ok(mut state) = self.state.lock() {
            state.collector = Some(collector);
        }
    }

    fn temporality(&self) -> Temporality {
        self.temporality
    }

    async fn force_flush(&self) -> MetricResult<()> {
        self.state.lock()?.flush_count += 1;
        Ok(())
    }

    async fn shutdown(&self) -> MetricResult<()> {
        let mut state = self.state.lock()?;
        if state.is_shutdown {
            return Err(MetricError::AlreadyShutdown);
        }
        state.is_shutdown = true;
        Ok(())
    }
}
