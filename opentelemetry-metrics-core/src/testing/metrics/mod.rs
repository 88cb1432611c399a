//! Metric readers for testing purpose.

#[doc(hidden)]
pub mod metric_reader;
pub use metric_reader::TestMetricReader;
