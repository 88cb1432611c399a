use std::fmt;

use crate::metrics::error::{MetricError, MetricResult};
use crate::metrics::instrument::InstrumentKind;

/// Default bucket boundaries of an explicit bucket histogram.
pub(crate) const DEFAULT_HISTOGRAM_BOUNDARIES: [f64; 15] = [
    0.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 250.0, 500.0, 750.0, 1000.0, 2500.0, 5000.0, 7500.0,
    10000.0,
];

/// The way recorded measurements are summarized.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Aggregation {
    /// An aggregation that drops all recorded data.
    Drop,

    /// An aggregation that uses the default mapping for the instrument kind.
    Default,

    /// An aggregation that summarizes a set of measurements as their arithmetic
    /// sum.
    Sum,

    /// An aggregation that summarizes a set of measurements as the last one made.
    LastValue,

    /// An aggregation that summarizes a set of measurements as a histogram with
    /// explicitly defined buckets.
    ExplicitBucketHistogram {
        /// The increasing bucket boundary values.
        ///
        /// Buckets are exclusive of their lower boundary and inclusive of their
        /// upper bound (except at positive infinity). With boundaries
        /// `[0.0, 5.0, 10.0]` the buckets are:
        ///
        /// (-∞, 0], (0, 5.0], (5.0, 10.0], (10.0, +∞)
        boundaries: Vec<f64>,

        /// Whether to record the min and max of the distribution.
        record_min_max: bool,
    },
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregation::Drop => "Drop",
            Aggregation::Default => "Default",
            Aggregation::Sum => "Sum",
            Aggregation::LastValue => "LastValue",
            Aggregation::ExplicitBucketHistogram { .. } => "ExplicitBucketHistogram",
        };

        f.write_str(name)
    }
}

impl Aggregation {
    /// Validate that this aggregation has correct configuration
    pub fn validate(&self) -> MetricResult<()> {
        match self {
            Aggregation::Drop | Aggregation::Default | Aggregation::Sum | Aggregation::LastValue => {
                Ok(())
            }
            Aggregation::ExplicitBucketHistogram { boundaries, .. } => {
                if boundaries.iter().any(|b| b.is_nan()) {
                    return Err(MetricError::Config(format!(
                        "aggregation: explicit bucket histogram: NaN boundary: {boundaries:?}",
                    )));
                }
                for x in boundaries.windows(2) {
                    if x[0] >= x[1] {
                        return Err(MetricError::Config(format!(
                            "aggregation: explicit bucket histogram: non-monotonic boundaries: {boundaries:?}",
                        )));
                    }
                }

                Ok(())
            }
        }
    }

    /// The aggregation used for `kind` when no view selects one.
    pub(crate) fn default_for(kind: InstrumentKind) -> Aggregation {
        match kind {
            InstrumentKind::Counter
            | InstrumentKind::UpDownCounter
            | InstrumentKind::ObservableCounter
            | InstrumentKind::ObservableUpDownCounter => Aggregation::Sum,
            InstrumentKind::ObservableGauge => Aggregation::LastValue,
            InstrumentKind::Histogram => Aggregation::ExplicitBucketHistogram {
                boundaries: DEFAULT_HISTOGRAM_BOUNDARIES.to_vec(),
                record_min_max: true,
            },
        }
    }

    /// Checks that this aggregation can summarize measurements of `kind`.
    ///
    /// `Default` and `Drop` are always compatible.
    pub(crate) fn is_compatible_with(&self, kind: InstrumentKind) -> MetricResult<()> {
        use InstrumentKind::*;

        match (self, kind) {
            (Aggregation::Default | Aggregation::Drop, _) => Ok(()),
            (Aggregation::ExplicitBucketHistogram { .. }, Counter | UpDownCounter | Histogram) => {
                Ok(())
            }
            (Aggregation::Sum, _) => Ok(()),
            (Aggregation::LastValue, ObservableGauge) => Ok(()),
            (agg, kind) => Err(MetricError::Config(format!(
                "aggregation {agg} is not compatible with instrument kind {kind:?}"
            ))),
        }
    }
}
