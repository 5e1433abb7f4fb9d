//! Span export for dispatch and script tracing.

use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
};
use opentelemetry_stdout::SpanExporter;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Service name attached to every exported span.
pub const SERVICE_NAME: &str = "courier";

fn filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install a subscriber that prints log lines and exports spans to stdout.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (for example
/// `"info"` or `"courier_dispatch=debug"`) selects what is recorded.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed.
pub fn init_telemetry(default_directive: &str) -> Result<(), Box<dyn std::error::Error>> {
    let provider = TracerProvider::builder()
        .with_simple_exporter(SpanExporter::default())
        .with_id_generator(RandomIdGenerator::default())
        .with_sampler(Sampler::AlwaysOn)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            SERVICE_NAME,
        )]))
        .build();

    let tracer = provider.tracer(SERVICE_NAME);
    opentelemetry::global::set_tracer_provider(provider);

    let span_layer = tracing_opentelemetry::layer()
        .with_tracer(tracer)
        .with_filter(filter(default_directive));

    let log_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(filter(default_directive));

    tracing_subscriber::registry()
        .with(span_layer)
        .with(log_layer)
        .try_init()?;

    Ok(())
}

/// Flush pending spans and drop the global tracer provider.
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}
