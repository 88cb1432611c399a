//! Resource detectors reading the process environment.
use std::env;

use opentelemetry::{Key, KeyValue, Value};

use super::{Resource, ResourceDetector, SERVICE_NAME};

const OTEL_RESOURCE_ATTRIBUTES: &str = "OTEL_RESOURCE_ATTRIBUTES";
const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";

/// Reads resource attributes from `OTEL_RESOURCE_ATTRIBUTES`, formatted as
/// `key1=value1,key2=value2`.
///
/// Keys and values are trimmed. Entries without `=` or with an empty key are
/// skipped; a repeated key keeps its last value.
#[derive(Debug, Default)]
pub struct EnvResourceDetector {
    _private: (),
}

impl EnvResourceDetector {
    /// Create `EnvResourceDetector` instance.
    pub fn new() -> Self {
        EnvResourceDetector { _private: () }
    }
}

impl ResourceDetector for EnvResourceDetector {
    fn detect(&self) -> Resource {
        match env::var(OTEL_RESOURCE_ATTRIBUTES) {
            Ok(s) if !s.is_empty() => parse_resource_attributes(&s),
            Ok(_) | Err(_) => Resource::empty(),
        }
    }
}

fn parse_resource_attributes(s: &str) -> Resource {
    Resource::new(s.split_terminator(',').filter_map(|entry| {
        let Some((key, value)) = entry.split_once('=') else {
            otel_debug!(
                name: "EnvResourceDetector.MalformedEntry",
                entry = entry,
            );
            return None;
        };
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(KeyValue::new(key.to_owned(), value.trim().to_owned()))
    }))
}

/// Provides the `service.name` attribute every resource must carry.
///
/// `OTEL_SERVICE_NAME` wins over a `service.name` entry in
/// `OTEL_RESOURCE_ATTRIBUTES`; without either the name is `unknown_service`.
#[derive(Debug)]
pub struct SdkProvidedResourceDetector;

impl ResourceDetector for SdkProvidedResourceDetector {
    fn detect(&self) -> Resource {
        let service_name = env::var(OTEL_SERVICE_NAME)
            .ok()
            .filter(|s| !s.is_empty())
            .map(Value::from)
            .or_else(|| {
                EnvResourceDetector::new()
                    .detect()
                    .get(&Key::from_static_str(SERVICE_NAME))
            })
            .unwrap_or_else(|| "unknown_service".into());

        Resource::new([KeyValue::new(SERVICE_NAME, service_name)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_resource_attributes() {
        temp_env::with_vars(
            [
                (
                    OTEL_RESOURCE_ATTRIBUTES,
                    Some("key=value, k = v , a= x, a=z,broken,=nokey"),
                ),
                ("IRRELEVANT", Some("20200810")),
            ],
            || {
                let resource = EnvResourceDetector::new().detect();
                assert_eq!(
                    resource,
                    Resource::new([
                        KeyValue::new("key", "value"),
                        KeyValue::new("k", "v"),
                        KeyValue::new("a", "z"),
                    ])
                );
            },
        );

        temp_env::with_var_unset(OTEL_RESOURCE_ATTRIBUTES, || {
            assert!(EnvResourceDetector::new().detect().is_empty());
        });
    }

    #[test]
    fn service_name_precedence() {
        let service_name = |resource: Resource| resource.get(&Key::from_static_str(SERVICE_NAME));

        temp_env::with_vars_unset([OTEL_SERVICE_NAME, OTEL_RESOURCE_ATTRIBUTES], || {
            assert_eq!(
                service_name(SdkProvidedResourceDetector.detect()),
                Some(Value::from("unknown_service"))
            );
        });

        temp_env::with_vars(
            [
                (OTEL_SERVICE_NAME, None),
                (OTEL_RESOURCE_ATTRIBUTES, Some("service.name=from attributes")),
            ],
            || {
                assert_eq!(
                    service_name(SdkProvidedResourceDetector.detect()),
                    Some(Value::from("from attributes"))
                );
            },
        );

        temp_env::with_vars(
            [
                (OTEL_SERVICE_NAME, Some("from env")),
                (OTEL_RESOURCE_ATTRIBUTES, Some("service.name=from attributes")),
            ],
            || {
                assert_eq!(
                    service_name(SdkProvidedResourceDetector.detect()),
                    Some(Value::from("from env"))
                );
            },
        );
    }
}
