//! Provides helper functions for initializing telemetry collection and publication.
use std::{convert::Infallible, net::SocketAddr};

use anyhow::Result;
use hyper::{
    service::{make_service_fn, service_fn},
    Body, Method, Request, Response, Server, StatusCode,
};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{metrics::MeterProvider, runtime, Resource};
use prometheus::{Encoder, TextEncoder};
use tokio::task::JoinHandle;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter, Registry};

const SERVICE_NAME: &str = "books-operator";

fn resource() -> Resource {
    Resource::new(vec![
        KeyValue::new(
            "hostname",
            gethostname::gethostname()
                .into_string()
                .unwrap_or_else(|_| "unknown".to_owned()),
        ),
        KeyValue::new("service.name", SERVICE_NAME),
    ])
}

/// Initialize tracing.
///
/// Logs are always written to stdout. When an OTLP endpoint is provided spans are also
/// exported to it.
pub async fn init_tracing(otlp_endpoint: Option<String>) -> Result<()> {
    // Setup filters
    // Default to INFO if no env is specified
    let log_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;

    let telemetry = match otlp_endpoint {
        Some(endpoint) => {
            let tracer = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(
                    opentelemetry_otlp::new_exporter()
                        .tonic()
                        .with_endpoint(endpoint),
                )
                .with_trace_config(opentelemetry_sdk::trace::config().with_resource(resource()))
                .install_batch(runtime::Tokio)?;
            let otlp_filter = EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()?;
            Some(
                tracing_opentelemetry::layer()
                    .with_tracer(tracer)
                    .with_filter(otlp_filter),
            )
        }
        None => None,
    };

    let logger = tracing_subscriber::fmt::layer()
        .with_ansi(true)
        .compact()
        .with_filter(log_filter);

    let collector = Registry::default().with(telemetry).with(logger);

    #[cfg(feature = "tokio-console")]
    let collector = {
        let console_filter = EnvFilter::builder().parse("tokio=trace,runtime=trace")?;
        let console_layer = console_subscriber::spawn().with_filter(console_filter);
        collector.with(console_layer)
    };

    // Initialize tracing
    tracing::subscriber::set_global_default(collector)?;

    Ok(())
}

/// Initialize metrics and serve them in the Prometheus text format on `addr`.
///
/// The returned meter provider is installed as the global provider and should be shutdown
/// before exit so buffered measurements are not lost.
pub async fn init_metrics_prom(
    addr: &SocketAddr,
) -> Result<(MeterProvider, JoinHandle<Result<(), hyper::Error>>)> {
    let registry = prometheus::Registry::new();
    let provider = prom_meter_provider(&registry)?;
    global::set_meter_provider(provider.clone());

    let make_svc = make_service_fn(move |_conn| {
        let registry = registry.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let registry = registry.clone();
                async move { Ok::<_, Infallible>(handle_metrics(req, &registry)) }
            }))
        }
    });
    let server = Server::try_bind(addr)?.serve(make_svc);
    tracing::info!(%addr, "serving prometheus metrics");

    Ok((provider, tokio::spawn(server)))
}

/// Build a meter provider whose measurements are gathered by the given registry.
pub fn prom_meter_provider(registry: &prometheus::Registry) -> Result<MeterProvider> {
    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;
    Ok(MeterProvider::builder()
        .with_reader(exporter)
        .with_resource(resource())
        .build())
}

fn handle_metrics(req: Request<Body>, registry: &prometheus::Registry) -> Response<Body> {
    if req.method() != Method::GET || req.uri().path() != "/metrics" {
        return status_response(StatusCode::NOT_FOUND);
    }
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(?err, "failed to encode metrics");
        return status_response(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let mut response = Response::new(Body::from(buffer));
    if let Ok(content_type) = encoder.format_type().parse() {
        response
            .headers_mut()
            .insert(hyper::header::CONTENT_TYPE, content_type);
    }
    response
}

fn status_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
