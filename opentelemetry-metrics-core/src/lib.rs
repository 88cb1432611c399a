//! # OpenTelemetry metrics collection core
//!
//! This crate accumulates measurements recorded against named instruments,
//! aggregates them per unique attribute set and serves point-in-time
//! snapshots to any number of independent readers.
//!
//! Every [`MetricReader`] registered with a [`SdkMeterProvider`] gets its own
//! [`MetricCollector`]. The collector fixes the reader's aggregation
//! [`Temporality`] and keys a private partition of every instrument's
//! aggregation state, so a delta reader draining its data never disturbs the
//! totals a cumulative reader is accumulating.
//!
//! ```
//! use opentelemetry::KeyValue;
//! use opentelemetry_metrics_core::metrics::{ManualReader, SdkMeterProvider, Temporality};
//!
//! # futures_executor::block_on(async {
//! let reader = ManualReader::builder()
//!     .with_temporality(Temporality::Cumulative)
//!     .build();
//! let provider = SdkMeterProvider::builder()
//!     .with_reader(reader.clone())
//!     .build();
//!
//! let counter = provider.meter("my_app").i64_counter("requests").build();
//! counter.add(5, &[KeyValue::new("route", "/")]);
//!
//! let metrics = reader.collect().await.unwrap();
//! assert_eq!(metrics.len(), 1);
//!
//! provider.shutdown().await.unwrap();
//! # });
//! ```
//!
//! [`MetricReader`]: crate::metrics::reader::MetricReader
//! [`SdkMeterProvider`]: crate::metrics::SdkMeterProvider
//! [`MetricCollector`]: crate::metrics::MetricCollector
//! [`Temporality`]: crate::metrics::Temporality
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

#[macro_use]
mod internal_logging;

pub mod metrics;
pub mod resource;
#[cfg(any(feature = "testing", test))]
#[doc(hidden)]
pub mod testing;

pub use resource::Resource;
