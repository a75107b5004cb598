use std::sync::OnceLock;
use std::time::{Duration, Instant};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// `OBSERVABILITY_ENABLED`, on unless set to `false` or `0`.
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true)
    })
}

/// Installs the Prometheus recorder and its upkeep task.
/// Returns `Ok(None)` when observability is disabled.
pub fn init_metrics() -> anyhow::Result<Option<PrometheusHandle>> {
    if !is_observability_enabled() {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5,
                10.0,
            ],
        )?
        .install_recorder()?;

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Ok(Some(handle))
}

/// Decrements `http_requests_active` when dropped, so cancelled requests
/// are not left counted.
struct ActiveRequest;

impl ActiveRequest {
    fn enter() -> Self {
        gauge!("http_requests_active").increment(1.0);
        ActiveRequest
    }
}

impl Drop for ActiveRequest {
    fn drop(&mut self) {
        gauge!("http_requests_active").decrement(1.0);
    }
}

fn status_class(status: StatusCode) -> &'static str {
    if status.is_success() {
        "2xx"
    } else if status.is_redirection() {
        "3xx"
    } else if status.is_client_error() {
        "4xx"
    } else if status.is_server_error() {
        "5xx"
    } else {
        "other"
    }
}

/// Records request count and latency, keyed by the matched route template
/// when routing has already run and by the raw path otherwise.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let route = match req.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_owned(),
        None => req.uri().path().to_owned(),
    };

    let _active = ActiveRequest::enter();
    let started = Instant::now();
    let response = next.run(req).await;
    let elapsed = started.elapsed().as_secs_f64();

    let status = response.status();
    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => route.clone(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "path" => route)
        .record(elapsed);
    counter!("http_requests_by_status", "status_category" => status_class(status)).increment(1);

    response
}

/// Router for the metrics server.
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

// Business metrics

pub fn track_login_success(role: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("user_logins_total", "role" => role.to_string(), "status" => "success").increment(1);
}

pub fn track_login_failure(reason: &'static str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("user_logins_total", "role" => "unknown", "status" => "failure", "reason" => reason)
        .increment(1);
}

pub fn track_user_created(role: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("users_created_total", "role" => role.to_string()).increment(1);
}

/// `outcome` is one of `created`, `updated`, `rejected`.
pub fn track_attendance(outcome: &'static str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("attendance_sessions_total", "outcome" => outcome).increment(1);
}

pub fn track_subject_conflict(kind: &'static str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("subject_schedule_conflicts_total", "kind" => kind).increment(1);
}

pub fn track_ticket_raised(with_attachment: bool) {
    if !is_observability_enabled() {
        return;
    }
    let attachment = if with_attachment { "yes" } else { "no" };
    counter!("tickets_raised_total", "attachment" => attachment).increment(1);
}

pub fn track_ticket_resolved(status: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("tickets_resolved_total", "status" => status.to_string()).increment(1);
}
