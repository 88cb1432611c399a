use std::{
    fmt,
    sync::{Arc, Mutex, Weak},
};

use async_trait::async_trait;

use super::{
    collector::MetricCollector,
    data::MetricData,
    error::{MetricError, MetricResult},
    reader::MetricReader,
    Temporality,
};

/// A simple [MetricReader] that allows an application to read metrics on demand.
///
/// Clones share the same registration, so a clone can be handed to the
/// provider while the original is kept to call [`ManualReader::collect`].
///
/// # Example
///
/// ```
/// use opentelemetry_metrics_core::metrics::{ManualReader, Temporality};
///
/// let reader = ManualReader::builder()
///     .with_temporality(Temporality::Delta)
///     .build();
/// # drop(reader)
/// ```
#[derive(Clone)]
pub struct ManualReader {
    inner: Arc<Mutex<ManualReaderInner>>,
    temporality: Temporality,
}

impl Default for ManualReader {
    fn default() -> Self {
        ManualReader::builder().build()
    }
}

impl fmt::Debug for ManualReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualReader")
            .field("temporality", &self.temporality)
            .finish()
    }
}

#[derive(Debug, Default)]
struct ManualReaderInner {
    collector: Option<Weak<MetricCollector>>,
    is_shutdown: bool,
}

impl ManualReader {
    /// Configuration for this reader
    pub fn builder() -> ManualReaderBuilder {
        ManualReaderBuilder::default()
    }

    /// Gathers the metrics of every meter, running observable callbacks as
    /// needed.
    ///
    /// Returns an error if the reader is not registered with a provider or was
    /// shut down.
    pub async fn collect(&self) -> MetricResult<Vec<MetricData>> {
        let collector = {
            let inner = self.inner.lock()?;
            if inner.is_shutdown {
                return Err(MetricError::AlreadyShutdown);
            }
            inner.collector.as_ref().and_then(Weak::upgrade)
        };

        match collector {
            Some(collector) => collector.collect().await,
            None => Err(MetricError::Other(
                "reader is not registered or its provider is gone".into(),
            )),
        }
    }
}

#[async_trait]
impl MetricReader for ManualReader {
    /// Keeps the collector so metrics can be read on demand.
    fn register_collector(&self, collector: Weak<MetricCollector>) {
        let _ = self.inner.lock().map(|mut inner| {
            // Only register once. If a collector is already set, do nothing.
            if inner.collector.is_none() {
                inner.collector = Some(collector);
            } else {
                otel_warn!(
                    name: "ManualReader.DuplicateRegistration",
                    message = "The same ManualReader was registered twice, keeping the first registration."
                );
            }
        });
    }

    fn temporality(&self) -> Temporality {
        self.temporality
    }

    /// ForceFlush is a no-op, it always returns `Ok`.
    async fn force_flush(&self) -> MetricResult<()> {
        Ok(())
    }

    /// Any future call to collect will return an error.
    async fn shutdown(&self) -> MetricResult<()> {
        let mut inner = self.inner.lock()?;
        inner.collector = None;
        inner.is_shutdown = true;
        Ok(())
    }
}

/// Configuration for a [ManualReader]
#[derive(Debug, Default)]
pub struct ManualReaderBuilder {
    temporality: Temporality,
}

impl ManualReaderBuilder {
    /// New manual builder configuration
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the [Temporality] of the data this reader collects.
    ///
    /// Defaults to [`Temporality::Cumulative`].
    pub fn with_temporality(mut self, temporality: Temporality) -> Self {
        self.temporality = temporality;
        self
    }

    /// Create a new [ManualReader] from this configuration.
    pub fn build(self) -> ManualReader {
        ManualReader {
            inner: Arc::new(Mutex::new(ManualReaderInner::default())),
            temporality: self.temporality,
        }
    }
}
