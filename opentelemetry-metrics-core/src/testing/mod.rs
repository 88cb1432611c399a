//! Helpers for testing code built on the metrics core.

pub mod metrics;
