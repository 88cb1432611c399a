use std::{borrow::Cow, collections::HashSet, fmt, sync::Arc};

use glob::{MatchOptions, Pattern};
use opentelemetry::{InstrumentationScope, Key, KeyValue};

use crate::metrics::aggregation::Aggregation;
use crate::metrics::error::{MetricError, MetricResult};
use crate::metrics::instrument::{InstrumentDescriptor, InstrumentKind};
use crate::metrics::internal::Filter;

/// Used to customize the streams produced for matching instruments.
///
/// A view selects instruments by name (glob wildcards allowed), kind,
/// meter name and meter version; every criterion that is set must match. For
/// each matching instrument it may rename the stream, replace its description,
/// restrict its attributes or pick another aggregation. The kind, unit and
/// value type of a stream always come from the instrument.
///
/// Every view that matches an instrument yields its own stream, so two views
/// can export one instrument under two names.
///
/// ```
/// use opentelemetry_metrics_core::metrics::{SdkMeterProvider, View};
///
/// let view = View::builder()
///     .with_instrument_name("http.duration")
///     .with_name("http_duration_a")
///     .build()
///     .unwrap();
///
/// let provider = SdkMeterProvider::builder().with_view(view).build();
/// # drop(provider)
/// ```
#[derive(Clone)]
pub struct View {
    instrument_name: Option<Pattern>,
    instrument_kind: Option<InstrumentKind>,
    meter_name: Option<Cow<'static, str>>,
    meter_version: Option<Cow<'static, str>>,
    pub(crate) name: Option<Cow<'static, str>>,
    pub(crate) description: Option<Cow<'static, str>>,
    pub(crate) attribute_filter: Option<Filter>,
    pub(crate) aggregation: Option<Aggregation>,
}

impl View {
    /// Create a new view builder.
    pub fn builder() -> ViewBuilder {
        ViewBuilder::default()
    }

    /// Whether this view selects the instrument described by `descriptor`,
    /// created by a meter with `scope`.
    pub fn matches(&self, descriptor: &InstrumentDescriptor, scope: &InstrumentationScope) -> bool {
        self.instrument_name
            .as_ref()
            .map_or(true, |pattern| {
                pattern.matches_with(&descriptor.name, NAME_MATCH_OPTIONS)
            })
            && self
                .instrument_kind
                .map_or(true, |kind| kind == descriptor.kind)
            && self
                .meter_name
                .as_ref()
                .map_or(true, |name| name.as_ref() == scope.name())
            && self
                .meter_version
                .as_ref()
                .map_or(true, |version| Some(version.as_ref()) == scope.version())
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("instrument_name", &self.instrument_name)
            .field("instrument_kind", &self.instrument_kind)
            .field("meter_name", &self.meter_name)
            .field("meter_version", &self.meter_version)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("has_attribute_filter", &self.attribute_filter.is_some())
            .field("aggregation", &self.aggregation)
            .finish()
    }
}

/// Returns the effective descriptor of `instrument` under `view`.
///
/// The name and description are replaced when the view sets them; kind, unit
/// and value type are always taken from the instrument.
pub fn apply_view(view: &View, instrument: &InstrumentDescriptor) -> InstrumentDescriptor {
    InstrumentDescriptor {
        name: view
            .name
            .clone()
            .unwrap_or_else(|| instrument.name.clone()),
        description: view
            .description
            .clone()
            .unwrap_or_else(|| instrument.description.clone()),
        unit: instrument.unit.clone(),
        kind: instrument.kind,
        value_type: instrument.value_type,
    }
}

const NAME_MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

fn is_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// A builder for [`View`].
#[derive(Default)]
pub struct ViewBuilder {
    instrument_name: Option<Cow<'static, str>>,
    instrument_kind: Option<InstrumentKind>,
    meter_name: Option<Cow<'static, str>>,
    meter_version: Option<Cow<'static, str>>,
    name: Option<Cow<'static, str>>,
    description: Option<Cow<'static, str>>,
    attribute_filter: Option<Filter>,
    aggregation: Option<Aggregation>,
}

impl ViewBuilder {
    /// Select instruments by name, compared case-insensitively.
    ///
    /// Glob wildcards (`*`, `?` and `[...]`) are supported.
    pub fn with_instrument_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.instrument_name = Some(name.into());
        self
    }

    /// Select instruments by kind.
    pub fn with_instrument_kind(mut self, kind: InstrumentKind) -> Self {
        self.instrument_kind = Some(kind);
        self
    }

    /// Select instruments created by meters with this name.
    pub fn with_meter_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.meter_name = Some(name.into());
        self
    }

    /// Select instruments created by meters with this version.
    pub fn with_meter_version(mut self, version: impl Into<Cow<'static, str>>) -> Self {
        self.meter_version = Some(version.into());
        self
    }

    /// Set the name of the produced stream.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description of the produced stream.
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Keep only attributes with these keys.
    ///
    /// An empty set drops all attributes.
    pub fn with_allowed_attribute_keys(self, keys: impl IntoIterator<Item = Key>) -> Self {
        let keys: HashSet<Key> = keys.into_iter().collect();
        self.with_attribute_filter(move |kv: &KeyValue| keys.contains(&kv.key))
    }

    /// Keep only attributes for which `filter` returns `true`.
    pub fn with_attribute_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&KeyValue) -> bool + Send + Sync + 'static,
    {
        self.attribute_filter = Some(Arc::new(filter));
        self
    }

    /// Set the aggregation of the produced stream.
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    /// Validates the configuration and builds the view.
    pub fn build(self) -> MetricResult<View> {
        if self.instrument_name.is_none()
            && self.instrument_kind.is_none()
            && self.meter_name.is_none()
            && self.meter_version.is_none()
        {
            return Err(MetricError::Config(
                "view must select instruments by at least one criterion".into(),
            ));
        }

        if self.name.is_some()
            && self
                .instrument_name
                .as_deref()
                .map_or(true, is_wildcard)
        {
            return Err(MetricError::Config(
                "a view renaming a stream must select a single instrument by exact name".into(),
            ));
        }

        if let Some(aggregation) = &self.aggregation {
            aggregation.validate()?;
        }

        let instrument_name = self
            .instrument_name
            .as_deref()
            .map(Pattern::new)
            .transpose()
            .map_err(|err| MetricError::Config(format!("invalid instrument name selector: {err}")))?;

        Ok(View {
            instrument_name,
            instrument_kind: self.instrument_kind,
            meter_name: self.meter_name,
            meter_version: self.meter_version,
            name: self.name,
            description: self.description,
            attribute_filter: self.attribute_filter,
            aggregation: self.aggregation,
        })
    }
}

impl fmt::Debug for ViewBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewBuilder")
            .field("instrument_name", &self.instrument_name)
            .field("instrument_kind", &self.instrument_kind)
            .field("name", &self.name)
            .field("aggregation", &self.aggregation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::instrument::{create_instrument_descriptor, InstrumentOptions, ValueType};
    use rstest::rstest;

    fn http_duration() -> InstrumentDescriptor {
        create_instrument_descriptor(
            "http.duration",
            InstrumentKind::Histogram,
            InstrumentOptions {
                description: Some("request latency".into()),
                unit: Some("ms".into()),
                value_type: Some(ValueType::Double),
            },
        )
    }

    #[rstest]
    #[case("http.duration", "http.duration", true)]
    #[case("HTTP.Duration", "http.duration", true)]
    #[case("http.*", "http.duration", true)]
    #[case("*", "anything", true)]
    #[case("http.?uration", "http.duration", true)]
    #[case("http.?", "http.duration", false)]
    #[case("*.duration", "rpc.latency", false)]
    #[case("a*b*c", "aXXbYYc", true)]
    #[case("a*b*c", "aXXbYY", false)]
    #[case("http.[dr]uration", "http.duration", true)]
    fn wildcard_patterns(#[case] pattern: &'static str, #[case] name: &'static str, #[case] expected: bool) {
        let view = View::builder()
            .with_instrument_name(pattern)
            .build()
            .unwrap();
        let descriptor =
            create_instrument_descriptor(name, InstrumentKind::Counter, InstrumentOptions::default());
        let scope = InstrumentationScope::builder("lib").build();
        assert_eq!(view.matches(&descriptor, &scope), expected);
    }

    #[test]
    fn malformed_name_selector_is_rejected() {
        assert!(matches!(
            View::builder().with_instrument_name("http.[duration").build(),
            Err(MetricError::Config(_))
        ));
    }

    #[test]
    fn apply_view_overrides_name_and_description_only() {
        let view = View::builder()
            .with_instrument_name("http.duration")
            .with_name("http_duration_a")
            .with_description("latency a")
            .build()
            .unwrap();
        let effective = apply_view(&view, &http_duration());

        assert_eq!(effective.name, "http_duration_a");
        assert_eq!(effective.description, "latency a");
        assert_eq!(effective.unit, "ms");
        assert_eq!(effective.kind, InstrumentKind::Histogram);
        assert_eq!(effective.value_type, ValueType::Double);
    }

    #[test]
    fn apply_view_without_overrides_is_identity_and_idempotent() {
        let view = View::builder()
            .with_instrument_kind(InstrumentKind::Histogram)
            .build()
            .unwrap();
        let once = apply_view(&view, &http_duration());
        assert_eq!(once, http_duration());
        assert_eq!(apply_view(&view, &once), once);

        let renaming = View::builder()
            .with_instrument_name("http.duration")
            .with_name("renamed")
            .build()
            .unwrap();
        let once = apply_view(&renaming, &http_duration());
        assert_eq!(apply_view(&renaming, &once), once);
    }

    #[test]
    fn matching_criteria() {
        let scope = InstrumentationScope::builder("http-lib")
            .with_version("1.2.0")
            .build();

        let by_meter = View::builder()
            .with_meter_name("http-lib")
            .with_meter_version("1.2.0")
            .build()
            .unwrap();
        assert!(by_meter.matches(&http_duration(), &scope));

        let other_version = View::builder()
            .with_meter_name("http-lib")
            .with_meter_version("2.0.0")
            .build()
            .unwrap();
        assert!(!other_version.matches(&http_duration(), &scope));

        let by_kind = View::builder()
            .with_instrument_name("http.*")
            .with_instrument_kind(InstrumentKind::Counter)
            .build()
            .unwrap();
        assert!(!by_kind.matches(&http_duration(), &scope));
    }

    #[test]
    fn invalid_views_are_rejected() {
        assert!(matches!(
            View::builder().with_name("x").build(),
            Err(MetricError::Config(_))
        ));
        assert!(View::builder()
            .with_instrument_name("http.*")
            .with_name("x")
            .build()
            .is_err());
        assert!(View::builder()
            .with_instrument_name("http.[ab]")
            .with_name("x")
            .build()
            .is_err());
        assert!(View::builder()
            .with_instrument_name("h")
            .with_aggregation(Aggregation::ExplicitBucketHistogram {
                boundaries: vec![2.0, 1.0],
                record_min_max: true,
            })
            .build()
            .is_err());
    }
}
