//! Prometheus metrics for SnapStore.
//!
//! Installs a global Prometheus recorder using `metrics-exporter-prometheus`,
//! defines metric name constants, provides an axum middleware for HTTP RED
//! metrics, and exposes the `/metrics` endpoint handler.

use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

// -- Metric name constants ----------------------------------------------------

/// Total HTTP requests (counter). Labels: method, path, status.
pub const HTTP_REQUESTS_TOTAL: &str = "snapstore_http_requests_total";

/// HTTP request duration in seconds (histogram). Labels: method, path.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "snapstore_http_request_duration_seconds";

/// Ingestion attempts (counter). Labels: outcome.
pub const UPLOADS_TOTAL: &str = "snapstore_uploads_total";

/// Bytes written to the object store by successful puts (counter).
pub const UPLOAD_BYTES_TOTAL: &str = "snapstore_upload_bytes_total";

/// Objects stored whose index insert failed (counter).
pub const ORPHAN_OBJECTS_TOTAL: &str = "snapstore_orphan_objects_total";

// -- Global recorder installation ---------------------------------------------

/// Singleton handle to the Prometheus recorder.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus metrics recorder. Idempotent -- safe to call
/// multiple times. Fails only if another global recorder was installed first.
pub fn init_metrics() -> anyhow::Result<&'static PrometheusHandle> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle);
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle))
}

/// Register metric descriptions with the global recorder. Call once after
/// `init_metrics()`.
pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(UPLOADS_TOTAL, "Upload attempts by outcome");
    describe_counter!(UPLOAD_BYTES_TOTAL, "Bytes written to the object store");
    describe_counter!(
        ORPHAN_OBJECTS_TOTAL,
        "Objects stored without a matching index record"
    );
}

// -- Metrics middleware -------------------------------------------------------

/// Axum middleware that records HTTP RED metrics for every request.
///
/// Excludes `/metrics` from self-instrumentation to avoid feedback loops.
pub async fn metrics_middleware(
    req: Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Response {
    // Do not instrument the metrics endpoint itself.
    if req.uri().path() == "/metrics" {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let start = Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path, "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

// -- Path normalization -------------------------------------------------------

/// Map a request path to a bounded set of metric labels.
///
/// Media keys are user-chosen, so everything under `/media/` collapses to a
/// single label, as does any unknown path.
fn normalize_path(path: &str) -> &'static str {
    match path {
        "/api/upload" => "/api/upload",
        "/api/list" => "/api/list",
        "/health" => "/health",
        "/readyz" => "/readyz",
        "/openapi.json" => "/openapi.json",
        p if p.starts_with("/media/") => "/media/{key}",
        _ => "other",
    }
}

// -- Metrics endpoint handler -------------------------------------------------

/// `GET /metrics` -- Render Prometheus exposition format text.
pub async fn metrics_handler() -> Response {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

// -- Tests --------------------------------------------------------------------
