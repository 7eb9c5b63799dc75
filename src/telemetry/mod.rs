//! Tracing initialization with optional OpenTelemetry export.
//!
//! Host applications embedding the dispatcher call [`init_telemetry`] once at
//! startup; spans from the dispatch path are exported over OTLP when
//! `OtelConfig.enabled` is set, and go to the console either way.

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider as SdkTracerProvider},
    Resource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::OtelConfig;

pub type TelemetryResult<T> = Result<T, TelemetryError>;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to build OTLP exporter: {0}")]
    ExporterBuild(String),
}

/// Keeps the tracer provider alive; dropping it flushes and shuts down export.
pub struct TelemetryGuard {
    _provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self._provider.is_some() {
            tracing::info!("Shutting down OpenTelemetry tracer provider");
        }
    }
}

/// Initialize the tracing subscriber, optionally layering in OTLP export.
///
/// Returns a guard that must be kept alive for the duration of the host
/// application.
pub fn init_telemetry(config: &OtelConfig) -> TelemetryResult<TelemetryGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.enabled {
        let provider = init_otel_tracer(config)?;
        let tracer = provider.tracer("campus-notify");
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .with(otel_layer)
            .init();

        tracing::info!(
            endpoint = %config.endpoint,
            service_name = %config.service_name,
            sampling_ratio = %config.sampling_ratio,
            "OpenTelemetry tracing initialized"
        );

        Ok(TelemetryGuard {
            _provider: Some(provider),
        })
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();

        tracing::info!("Tracing initialized (OpenTelemetry disabled)");

        Ok(TelemetryGuard { _provider: None })
    }
}

fn init_otel_tracer(config: &OtelConfig) -> TelemetryResult<SdkTracerProvider> {
    use opentelemetry::KeyValue;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.endpoint)
        .build()
        .map_err(|e| TelemetryError::ExporterBuild(e.to_string()))?;

    let sampler = if config.sampling_ratio >= 1.0 {
        Sampler::AlwaysOn
    } else if config.sampling_ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(config.sampling_ratio)
    };

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_sampler(sampler)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(Resource::new(vec![
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                config.service_name.clone(),
            ),
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            ),
        ]))
        .build();

    Ok(provider)
}

/// Span attribute helpers for the dispatch domain.
pub mod attributes {
    use opentelemetry::KeyValue;

    pub fn dispatch_id(id: uuid::Uuid) -> KeyValue {
        KeyValue::new("dispatch.id", id.to_string())
    }

    pub fn notification_type(kind: &str) -> KeyValue {
        KeyValue::new("notification.type", kind.to_string())
    }

    pub fn attempt(n: u32) -> KeyValue {
        KeyValue::new("dispatch.attempt", n as i64)
    }

    pub fn send_all(flag: bool) -> KeyValue {
        KeyValue::new("notification.send_all", flag)
    }

    pub fn targeting_conditions(count: usize) -> KeyValue {
        KeyValue::new("notification.targeting_conditions", count as i64)
    }

    pub fn http_status(code: u16) -> KeyValue {
        KeyValue::new("http.status_code", code as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OtelConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.endpoint, "http://localhost:4317");
        assert_eq!(config.service_name, "campus-notify");
        assert_eq!(config.sampling_ratio, 1.0);
    }

    #[test]
    fn test_attributes() {
        let id = attributes::dispatch_id(uuid::Uuid::nil());
        assert_eq!(id.key.as_str(), "dispatch.id");

        let kind = attributes::notification_type("announcement");
        assert_eq!(kind.key.as_str(), "notification.type");

        let all = attributes::send_all(true);
        assert_eq!(all.key.as_str(), "notification.send_all");
    }

    #[test]
    fn test_telemetry_guard_creation() {
        let guard = TelemetryGuard { _provider: None };
        drop(guard); // Should not panic
    }
}
