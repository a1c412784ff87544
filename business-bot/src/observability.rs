//! OpenTelemetry meter provider initialization.
//!
//! With an OTLP endpoint configured, a periodic OTLP/gRPC exporter is installed as the global
//! meter provider, which the runtime's instruments pick up. Without one the global provider
//! stays the no-op default.

use anyhow::{Context, Result};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig as _;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::Resource;
use tracing::{info, warn};

use crate::config::AppConfig;

const SERVICE_NAME: &str = "business-bot";

fn build_resource() -> Resource {
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_attributes([KeyValue::new("service.version", env!("CARGO_PKG_VERSION"))])
        .build()
}

/// Installs the global meter provider. Must run before any instrument is created.
///
/// The caller keeps the returned provider and passes it to [`shutdown_metrics`] on exit.
pub fn init_metrics(config: &AppConfig) -> Result<Option<SdkMeterProvider>> {
    let Some(endpoint) = config.otlp_endpoint.as_deref() else {
        info!("OTEL_EXPORTER_OTLP_ENDPOINT not set, metrics are not exported");
        return Ok(None);
    };

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("Failed to build OTLP metric exporter")?;

    let provider = SdkMeterProvider::builder()
        .with_resource(build_resource())
        .with_periodic_exporter(exporter)
        .build();
    global::set_meter_provider(provider.clone());

    info!(endpoint = %endpoint, "OTLP metric export enabled");
    Ok(Some(provider))
}

/// Flushes and stops the provider installed by [`init_metrics`].
pub fn shutdown_metrics(provider: Option<SdkMeterProvider>) {
    if let Some(provider) = provider {
        if let Err(e) = provider.shutdown() {
            warn!(error = %e, "Failed to shut down meter provider");
        }
    }
}
