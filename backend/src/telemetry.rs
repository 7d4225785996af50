//! Tracing subscriber setup with optional OpenTelemetry export.
//!
//! Logs always go to stdout through the fmt layer. When an OTLP endpoint is
//! configured, spans are additionally exported over gRPC.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "supply_depot_backend=debug,tower_http=debug,sqlx::query=info";

/// Initialize the global tracing subscriber.
///
/// Hold the returned guard for the lifetime of the process so buffered spans
/// are flushed on shutdown.
pub fn init_tracing(otel_endpoint: Option<&str>, service_name: &str) -> Option<OtelGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match otel_endpoint {
        Some(endpoint) => match init_with_otel(endpoint, service_name, env_filter) {
            Ok(guard) => {
                tracing::info!(otel_endpoint = endpoint, service_name, "OpenTelemetry tracing enabled");
                Some(guard)
            }
            Err(e) => {
                tracing_subscriber::registry()
                    .with(EnvFilter::new(DEFAULT_FILTER))
                    .with(tracing_subscriber::fmt::layer())
                    .init();
                tracing::warn!("Failed to set up OTLP exporter, logging to stdout only: {}", e);
                None
            }
        },
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    }
}

/// Shuts the tracer provider down on drop.
pub struct OtelGuard {
    provider: opentelemetry_sdk::trace::SdkTracerProvider,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(e) = self.provider.shutdown() {
            eprintln!("Failed to shutdown OTel tracer provider: {e:?}");
        }
    }
}

fn init_with_otel(
    endpoint: &str,
    service_name: &str,
    env_filter: EnvFilter,
) -> Result<OtelGuard, Box<dyn std::error::Error + Send + Sync>> {
    use opentelemetry::trace::TracerProvider;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::{SpanExporter, WithExportConfig};
    use opentelemetry_sdk::trace::{BatchSpanProcessor, SdkTracerProvider};
    use opentelemetry_sdk::Resource;

    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", service_name.to_owned()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION").to_owned()),
        ])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_span_processor(BatchSpanProcessor::builder(exporter).build())
        .build();

    let tracer = provider.tracer("supply-depot");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .init();

    Ok(OtelGuard { provider })
}
