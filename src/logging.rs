//! Request logging and tracing setup.
//!
//! Console output is filtered by `RUST_LOG` (falling back to `LOG_LEVEL` for
//! this crate). Errors and structured JSON logs roll daily under
//! `storage/logs/`. Spans are exported over OTLP when observability is on.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use opentelemetry::{KeyValue, global, trace::TraceError};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    propagation::TraceContextPropagator,
    runtime,
    trace::{RandomIdGenerator, Sampler, Tracer},
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::metrics::is_observability_enabled;

const LOG_DIR: &str = "storage/logs";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Logs each request once on the way in and once with its outcome. The
/// request id is taken from `x-request-id` when the client sends one and is
/// echoed back on the response.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 64)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    info!(request_id = %request_id, method = %method, route = %route, "Incoming request");

    let mut response = next.run(req).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    if response.status().is_server_error() {
        error!(request_id = %request_id, method = %method, route = %route, status, latency_ms, "Server error");
    } else if response.status().is_client_error() {
        warn!(request_id = %request_id, method = %method, route = %route, status, latency_ms, "Client error");
    } else {
        info!(request_id = %request_id, method = %method, route = %route, status, latency_ms, "Request completed");
    }

    response
}

fn default_filter() -> String {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    format!(
        "{}={level},rollcall_db={level},tower_http=warn,hyper=info,tonic=info,sqlx=warn",
        env!("CARGO_CRATE_NAME")
    )
}

fn init_tracer() -> Result<Tracer, TraceError> {
    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::new(vec![
        KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
        KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        KeyValue::new(
            "environment",
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        ),
    ]);

    let otlp_exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(otlp_endpoint);

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(otlp_exporter)
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .install_batch(runtime::Tokio)
}

pub fn init_tracing() -> anyhow::Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::fmt;

    std::fs::create_dir_all(LOG_DIR)?;

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .with_filter(console_filter);

    let file_appender = RollingFileAppender::new(Rotation::DAILY, LOG_DIR, "rollcall.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_filter(EnvFilter::new("error"));

    let json_appender = RollingFileAppender::new(Rotation::DAILY, LOG_DIR, "rollcall.json");
    let json_layer = fmt::layer()
        .json()
        .with_writer(json_appender)
        .with_current_span(true)
        .with_span_list(true)
        .with_filter(EnvFilter::new("info"));

    let tracer = if is_observability_enabled() {
        match init_tracer() {
            Ok(tracer) => Some(tracer),
            Err(e) => {
                eprintln!(
                    "⚠️  Failed to initialize OpenTelemetry: {}. Continuing without it...",
                    e
                );
                None
            }
        }
    } else {
        None
    };

    let otel_enabled = tracer.is_some();
    let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()?;

    if otel_enabled {
        info!("Tracing initialized with OpenTelemetry and file logging");
    } else {
        warn!("Tracing initialized without OpenTelemetry (file logging only)");
    }

    Ok(())
}

pub async fn shutdown_tracer() {
    if !is_observability_enabled() {
        return;
    }

    info!("Shutting down OpenTelemetry tracer...");
    global::shutdown_tracer_provider();
}
