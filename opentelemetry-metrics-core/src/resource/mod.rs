//! Representations of entities producing telemetry.
//!
//! A [Resource] is an immutable set of attributes describing the entity that
//! produced the measurements, for example a service name and the SDK that
//! recorded them. Every [`MetricData`](crate::metrics::data::MetricData) a
//! provider produces carries its resource.
//!
//! # Resource detectors
//!
//! [`ResourceDetector`]s build resources from the runtime environment. The
//! following are used by [`Resource::builder`]:
//!
//! - [`SdkProvidedResourceDetector`] - the mandatory `service.name`.
//! - [`TelemetryResourceDetector`] - the telemetry SDK's information.
//! - [`EnvResourceDetector`] - attributes from `OTEL_RESOURCE_ATTRIBUTES`.
mod env;
mod telemetry;

mod attributes;
pub(crate) use attributes::*;

pub use env::{EnvResourceDetector, SdkProvidedResourceDetector};
pub use telemetry::TelemetryResourceDetector;

use opentelemetry::{Key, KeyValue, Value};
use std::borrow::Cow;
use std::collections::{hash_map, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
struct ResourceInner {
    attrs: HashMap<Key, Value>,
    schema_url: Option<Cow<'static, str>>,
}

/// An immutable representation of the entity producing telemetry as attributes.
///
/// Cloning is cheap, clones share the attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

impl Resource {
    /// Creates a [ResourceBuilder] starting from the detected default
    /// attributes.
    ///
    /// The [SdkProvidedResourceDetector], [TelemetryResourceDetector] and
    /// [EnvResourceDetector] are applied in that order, later ones winning.
    /// Use [Resource::builder_empty] to start from an empty resource.
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder {
            resource: Self::from_detectors(&[
                Box::new(SdkProvidedResourceDetector),
                Box::new(TelemetryResourceDetector),
                Box::new(EnvResourceDetector::new()),
            ]),
        }
    }

    /// Creates a [ResourceBuilder] without any attributes.
    pub fn builder_empty() -> ResourceBuilder {
        ResourceBuilder {
            resource: Resource::empty(),
        }
    }

    /// A resource with no attributes and no schema URL.
    pub(crate) fn empty() -> Self {
        Resource {
            inner: Arc::new(ResourceInner {
                attrs: HashMap::new(),
                schema_url: None,
            }),
        }
    }

    /// Values are de-duplicated by key, the last one wins.
    pub(crate) fn new<T: IntoIterator<Item = KeyValue>>(kvs: T) -> Self {
        Resource {
            inner: Arc::new(ResourceInner {
                attrs: kvs.into_iter().map(|kv| (kv.key, kv.value)).collect(),
                schema_url: None,
            }),
        }
    }

    fn from_detectors(detectors: &[Box<dyn ResourceDetector>]) -> Self {
        detectors
            .iter()
            .fold(Resource::empty(), |resource, detector| {
                resource.merge(&detector.detect())
            })
    }

    /// Combines two resources, keys of `other` winning.
    ///
    /// The schema URL of `self` is kept unless only `other` has one; two
    /// different schema URLs cancel each other out.
    fn merge(&self, other: &Resource) -> Self {
        if self.is_empty() && self.inner.schema_url.is_none() {
            return other.clone();
        }
        if other.is_empty() && other.inner.schema_url.is_none() {
            return self.clone();
        }

        let mut attrs = self.inner.attrs.clone();
        attrs.extend(
            other
                .inner
                .attrs
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        let schema_url = match (&self.inner.schema_url, &other.inner.schema_url) {
            (Some(a), Some(b)) if a == b => Some(a.clone()),
            (Some(_), Some(_)) => None,
            (None, Some(url)) | (Some(url), None) => Some(url.clone()),
            (None, None) => None,
        };

        Resource {
            inner: Arc::new(ResourceInner { attrs, schema_url }),
        }
    }

    /// The schema URL of the resource, if any.
    pub fn schema_url(&self) -> Option<&str> {
        self.inner.schema_url.as_deref()
    }

    /// Returns the number of attributes for this resource
    pub fn len(&self) -> usize {
        self.inner.attrs.len()
    }

    /// Returns `true` if the resource contains no attributes.
    pub fn is_empty(&self) -> bool {
        self.inner.attrs.is_empty()
    }

    /// Gets an iterator over the attributes of this resource.
    pub fn iter(&self) -> Iter<'_> {
        Iter(self.inner.attrs.iter())
    }

    /// Retrieve the value from resource associate with given key.
    pub fn get(&self, key: &Key) -> Option<Value> {
        self.inner.attrs.get(key).cloned()
    }
}

/// An iterator over the entries of a `Resource`.
#[derive(Debug)]
pub struct Iter<'a>(hash_map::Iter<'a, Key, Value>);

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Key, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl<'a> IntoIterator for &'a Resource {
    type Item = (&'a Key, &'a Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Detects resource information from the runtime environment.
pub trait ResourceDetector {
    /// Returns the detected resource.
    ///
    /// When the information is unavailable or invalid an empty resource is
    /// returned.
    fn detect(&self) -> Resource;
}

/// Builder for [Resource]
#[derive(Debug)]
pub struct ResourceBuilder {
    resource: Resource,
}

impl ResourceBuilder {
    /// Merge in the resource found by `detector`.
    pub fn with_detector(mut self, detector: Box<dyn ResourceDetector>) -> Self {
        self.resource = self.resource.merge(&detector.detect());
        self
    }

    /// Add a [KeyValue] to the resource.
    pub fn with_attribute(self, kv: KeyValue) -> Self {
        self.with_attributes([kv])
    }

    /// Add multiple [KeyValue]s to the resource.
    pub fn with_attributes<T: IntoIterator<Item = KeyValue>>(mut self, kvs: T) -> Self {
        self.resource = self.resource.merge(&Resource::new(kvs));
        self
    }

    /// Add `service.name` resource attribute.
    pub fn with_service_name(self, name: impl Into<Value>) -> Self {
        self.with_attribute(KeyValue::new(SERVICE_NAME, name.into()))
    }

    /// Set the schema URL, merged with the one already present.
    pub fn with_schema_url(mut self, schema_url: impl Into<Cow<'static, str>>) -> Self {
        let schema_url = schema_url.into();
        if !schema_url.is_empty() {
            let with_url = Resource {
                inner: Arc::new(ResourceInner {
                    attrs: HashMap::new(),
                    schema_url: Some(schema_url),
                }),
            };
            self.resource = self.resource.merge(&with_url);
        }
        self
    }

    /// Create a [Resource] with the options provided to the [ResourceBuilder].
    pub fn build(self) -> Resource {
        self.resource
    }
}
