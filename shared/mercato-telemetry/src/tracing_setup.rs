//! Tracing setup.

use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::Tracer;
use opentelemetry_sdk::Resource;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{
    layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter,
};

use crate::{TelemetryConfig, TelemetryError};

/// Initialize tracing with OpenTelemetry.
///
/// Installs the global subscriber: env-filtered fmt output (JSON or plain)
/// plus, when an OTLP endpoint is configured, a batch span exporter. Spans
/// marked failed by consume-fault observers are exported through that layer.
pub fn init_tracing(service_name: &str, config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logs {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true);

        let otel_layer = config
            .otlp_endpoint
            .as_deref()
            .map(|endpoint| otlp_layer(service_name, endpoint))
            .transpose()?;

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()
            .map_err(|e| TelemetryError::TracingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

        let otel_layer = config
            .otlp_endpoint
            .as_deref()
            .map(|endpoint| otlp_layer(service_name, endpoint))
            .transpose()?;

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()
            .map_err(|e| TelemetryError::TracingInit(e.to_string()))?;
    }

    tracing::info!(
        service = service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        otlp = config.otlp_endpoint.is_some(),
        "Tracing initialized"
    );

    Ok(())
}

/// Batch OTLP export over tonic, tagged with the service name resource.
fn otlp_layer<S>(
    service_name: &str,
    endpoint: &str,
) -> Result<OpenTelemetryLayer<S, Tracer>, TelemetryError>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint.to_string()),
        )
        .with_trace_config(opentelemetry_sdk::trace::Config::default().with_resource(
            Resource::new(vec![KeyValue::new("service.name", service_name.to_string())]),
        ))
        .install_batch(opentelemetry_sdk::runtime::Tokio)
        .map_err(|e| TelemetryError::OtlpConfig(e.to_string()))?;

    Ok(tracing_opentelemetry::layer().with_tracer(tracer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::Registry;

    // Exporter construction is lazy, so no collector is required here.
    #[tokio::test(flavor = "multi_thread")]
    async fn otlp_layer_builds_against_a_configured_endpoint() {
        let layer = otlp_layer::<Registry>("catalog", "http://127.0.0.1:4317");
        assert!(layer.is_ok());
    }
}
