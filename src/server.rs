//! Axum router construction and route mapping.
//!
//! The [`app`] function wires every endpoint to its handler and returns a
//! ready-to-serve [`axum::Router`].  Route handlers stay thin: they unpack
//! extractors and delegate to `crate::handlers`.

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, head, put},
    Json, Router,
};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::errors::{generate_request_id, GatewayError};
use crate::AppState;

// -- OpenAPI specification ----------------------------------------------------

/// OpenAPI documentation for the commonfs gateway API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "commonfs API",
        version = "0.1.0",
        description = "Content-verified binary object storage gateway"
    ),
    paths(
        health_check,
        handle_create_atomically,
        handle_head_file,
        handle_put_testing,
        handle_get_testing,
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Files", description = "Verified upload and metadata lookup"),
        (name = "Legacy", description = "Pre-existing test endpoints"),
    )
)]
struct ApiDoc;

/// Build the axum [`Router`] with all gateway routes.
///
/// The returned router is ready to be passed to `axum::serve`.
pub fn app(state: Arc<AppState>) -> Router {
    let openapi = ApiDoc::openapi();

    Router::new()
        // Health check endpoint.
        .route("/health", get(health_check))
        // OpenAPI spec at /openapi.json.
        .route(
            "/openapi.json",
            get(move || {
                let openapi = openapi.clone();
                async move { Json(openapi) }
            }),
        )
        // Verified upload and metadata lookup.
        .route("/commonfs/createAtomically", put(handle_create_atomically))
        .route("/commonfs/:fileid", head(handle_head_file))
        // Legacy test endpoints, kept on the canonical pipeline components.
        .route("/testing", put(handle_put_testing).get(handle_get_testing))
        // Application state shared across all handlers.
        .with_state(state)
        // Adds request id / date / server headers to every response.
        .layer(middleware::from_fn(common_headers_middleware))
        // Request lifecycle tracing.
        .layer(TraceLayer::new_for_http())
        // Uploads can be large; the handler enforces the configured limit.
        .layer(DefaultBodyLimit::disable())
}

// -- Common headers middleware -----------------------------------------------

/// Tower middleware that adds common response headers to every response:
/// - `x-request-id`: 16-character hex string
/// - `Date`: RFC 7231 formatted timestamp
/// - `Server`: `commonfs`
async fn common_headers_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    if !headers.contains_key("x-request-id") {
        let request_id = generate_request_id();
        headers.insert("x-request-id", HeaderValue::from_str(&request_id).unwrap());
    }

    let date = httpdate::fmt_http_date(std::time::SystemTime::now());
    headers.insert("date", HeaderValue::from_str(&date).unwrap());
    headers.insert("server", HeaderValue::from_static("commonfs"));

    response
}

// -- Health check ------------------------------------------------------------

/// `GET /health` -- Returns `{"status": "ok"}` with 200 OK.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "HealthCheck",
    responses(
        (status = 200, description = "Health check OK")
    )
)]
async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "application/json")],
        r#"{"status":"ok"}"#,
    )
}

// -- Route dispatch ----------------------------------------------------------

/// `PUT /commonfs/createAtomically` -- verified atomic upload.
#[utoipa::path(
    put,
    path = "/commonfs/createAtomically",
    tag = "Files",
    operation_id = "CreateAtomically",
    request_body = Vec<u8>,
    responses(
        (status = 200, description = "Upload committed, or accepted as a no-op"),
        (status = 400, description = "Parse, staging or verification failure"),
        (status = 500, description = "Backing store failure")
    )
)]
async fn handle_create_atomically(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    crate::handlers::upload::create_atomically(state, &headers, body).await
}

/// `HEAD /commonfs/{fileid}` -- metadata lookup by identifier.
#[utoipa::path(
    head,
    path = "/commonfs/{fileid}",
    tag = "Files",
    operation_id = "HeadFile",
    responses(
        (status = 200, description = "Found; properties returned as response headers"),
        (status = 404, description = "No such file")
    )
)]
async fn handle_head_file(
    State(state): State<Arc<AppState>>,
    Path(fileid): Path<String>,
) -> Result<Response, GatewayError> {
    crate::handlers::retrieve::head_file(state, &fileid).await
}

/// `PUT /testing` -- legacy write endpoint.
#[utoipa::path(
    put,
    path = "/testing",
    tag = "Legacy",
    operation_id = "PutTesting",
    request_body = Vec<u8>,
    responses(
        (status = 200, description = "Body appended to the fixed staging file")
    )
)]
async fn handle_put_testing(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    crate::handlers::retrieve::put_testing(state, &headers, body).await
}

/// `GET /testing` -- legacy read endpoint.
#[utoipa::path(
    get,
    path = "/testing",
    tag = "Legacy",
    operation_id = "GetTesting",
    responses(
        (status = 200, description = "Streams the well-known blob"),
        (status = 404, description = "Blob absent")
    )
)]
async fn handle_get_testing(State(state): State<Arc<AppState>>) -> Result<Response, GatewayError> {
    crate::handlers::retrieve::get_testing(state).await
}
