//! Axum router construction.
//!
//! The [`app`] function wires the gallery endpoints, probes, metrics, and
//! the OpenAPI document to their handlers and returns a ready-to-serve
//! [`axum::Router`].

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;

use crate::errors::generate_request_id;
use crate::handlers::{self, method_not_allowed};
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::AppState;

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Deadline for the readiness probe's store round trip.
const READINESS_TIMEOUT: Duration = Duration::from_secs(2);

// -- OpenAPI document ---------------------------------------------------------

/// OpenAPI documentation for the gallery API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "SnapStore Gallery API",
        version = "0.1.0",
        description = "Media upload and gallery listing"
    ),
    paths(
        health_check,
        readiness_check,
        crate::handlers::upload::upload,
        crate::handlers::list::list_images,
    ),
    components(schemas(
        crate::handlers::upload::UploadResponse,
        crate::handlers::list::ListResponse,
        crate::handlers::list::ImageEntry,
        crate::errors::ErrorBody,
    )),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Gallery", description = "Media upload and listing"),
    )
)]
struct ApiDoc;

/// Build the axum [`Router`] with all routes.
///
/// The returned router is ready to be passed to `axum::serve`.
pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.config.ingest.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let mut router: Router<Arc<AppState>> = Router::new()
        .route(
            "/api/upload",
            post(handlers::upload::upload).fallback(method_not_allowed),
        )
        .route(
            "/api/list",
            get(handlers::list::list_images).fallback(method_not_allowed),
        )
        .route("/openapi.json", get(openapi_json));

    if state.config.observability.health_check {
        router = router
            .route("/health", get(health_check))
            .route("/readyz", get(readiness_check));
    }
    if state.config.observability.metrics {
        router = router.route("/metrics", get(metrics_handler));
    }
    // Local objects are published here so their locators resolve.
    if state.config.storage.backend == "local" {
        router = router.nest_service(
            "/media",
            ServeDir::new(&state.config.storage.local.root_dir),
        );
    }

    router
        .with_state(state)
        // Layer ordering: inner layers run first, outer layers wrap them.
        .layer(middleware::from_fn(request_id_middleware))
        // metrics_middleware is outer (captures full request lifecycle).
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit))
}

// -- Request id middleware ----------------------------------------------------

/// Adds `x-request-id` (16 uppercase hex chars), `date`, and `server`
/// headers to every response.
async fn request_id_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    if !headers.contains_key("x-request-id") {
        if let Ok(value) = HeaderValue::from_str(&generate_request_id()) {
            headers.insert("x-request-id", value);
        }
    }
    if let Ok(value) = HeaderValue::from_str(&httpdate::fmt_http_date(SystemTime::now())) {
        headers.insert("date", value);
    }
    headers.insert("server", HeaderValue::from_static("SnapStore"));

    response
}

// -- Health checks -------------------------------------------------------------

/// `GET /health` -- Returns `{"status": "ok"}` with 200 OK.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "HealthCheck",
    responses(
        (status = 200, description = "Process is up")
    )
)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// `GET /readyz` -- 200 when the metadata index answers, 503 otherwise.
#[utoipa::path(
    get,
    path = "/readyz",
    tag = "Health",
    operation_id = "ReadinessCheck",
    responses(
        (status = 200, description = "Index reachable"),
        (status = 503, description = "Index unreachable")
    )
)]
async fn readiness_check(State(state): State<Arc<AppState>>) -> Response {
    let ping = tokio::time::timeout(READINESS_TIMEOUT, state.metadata.ping()).await;
    match ping {
        Ok(Ok(())) => (StatusCode::OK, Json(json!({"status": "ready"}))).into_response(),
        Ok(Err(err)) => {
            warn!("Readiness check failed: {err:#}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unavailable"})),
            )
                .into_response()
        }
        Err(_) => {
            warn!("Readiness check timed out");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unavailable"})),
            )
                .into_response()
        }
    }
}

/// `GET /openapi.json` -- The OpenAPI document.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
