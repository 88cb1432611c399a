use std::result;
use std::sync::PoisonError;
use thiserror::Error;

/// A specialized `Result` type for metric operations.
pub type MetricResult<T> = result::Result<T, MetricError>;

/// Errors returned by the metrics core.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MetricError {
    /// Other errors not covered by specific cases.
    #[error("Metrics error: {0}")]
    Other(String),
    /// Invalid configuration
    #[error("Config error {0}")]
    Config(String),
    /// Invalid instrument configuration such invalid instrument name, invalid
    /// instrument description, invalid instrument unit, etc.
    #[error("Invalid instrument configuration: {0}")]
    InvalidInstrumentConfiguration(&'static str),
    /// Two instruments with the same name but incompatible identity were
    /// registered in one meter.
    #[error("Conflicting instrument definitions: {0}")]
    Conflict(String),
    /// An observable callback failed or panicked during a collection pass.
    ///
    /// Only ever logged, a failing callback never fails a collection.
    #[error("Observable callback for {instrument} failed: {reason}")]
    CallbackFailure {
        /// Name of the instrument the callback belongs to.
        instrument: String,
        /// What went wrong.
        reason: String,
    },
    /// The collector (or reader) has been shut down, or is shutting down.
    #[error("collector is shut down")]
    AlreadyShutdown,
    /// A meter could not produce its data for a collection pass.
    #[error("Meter {meter} failed to collect: {reason}")]
    MeterCollection {
        /// Name of the failing meter's instrumentation scope.
        meter: String,
        /// What went wrong.
        reason: String,
    },
}

impl<T> From<PoisonError<T>> for MetricError {
    fn from(err: PoisonError<T>) -> Self {
        MetricError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn poisoned_lock_converts_to_other() {
        let lock = Arc::new(Mutex::new(0));
        let cloned = lock.clone();
        let _ = std::thread::spawn(move || {
            let _guard = cloned.lock().unwrap();
            panic!("poison");
        })
        .join();

        let err: MetricError = lock.lock().unwrap_err().into();
        assert!(matches!(err, MetricError::Other(_)));
    }

    #[test]
    fn lifecycle_error_message() {
        assert_eq!(
            MetricError::AlreadyShutdown.to_string(),
            "collector is shut down"
        );
    }
}
