use opentelemetry::KeyValue;

use super::{
    Resource, ResourceDetector, TELEMETRY_SDK_LANGUAGE, TELEMETRY_SDK_NAME, TELEMETRY_SDK_VERSION,
};

/// Detects the telemetry SDK information attached to every stream.
///
/// It provides:
/// - `telemetry.sdk.name`, always `opentelemetry`.
/// - `telemetry.sdk.language`, always `rust`.
/// - `telemetry.sdk.version`, the version of this crate.
#[derive(Debug)]
pub struct TelemetryResourceDetector;

impl ResourceDetector for TelemetryResourceDetector {
    fn detect(&self) -> Resource {
        Resource::new([
            KeyValue::new(TELEMETRY_SDK_NAME, "opentelemetry"),
            KeyValue::new(TELEMETRY_SDK_LANGUAGE, "rust"),
            KeyValue::new(TELEMETRY_SDK_VERSION, env!("CARGO_PKG_VERSION")),
        ])
    }
}
