//! Retrieval handlers: metadata lookups and the legacy `/testing` routes.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tracing::debug;

use crate::errors::GatewayError;
use crate::meta::parse_meta;
use crate::retrieval::RetrievalService;
use crate::AppState;

/// Well-known blob name served by the legacy read endpoint.
const LEGACY_BLOB_NAME: &str = "hello";

/// Fixed staging file written by the legacy write endpoint.
const LEGACY_STAGING_FILE: &str = "testing.bin";

/// `HEAD /commonfs/{fileid}` — metadata lookup by backing-store identifier.
///
/// Found: 200 with the four property headers and no body.  Missing or
/// ill-formed id: bare 404, no body.
pub async fn head_file(state: Arc<AppState>, fileid: &str) -> Result<Response, GatewayError> {
    let retrieval = RetrievalService::new(state.store.clone());
    let view = match retrieval.by_id(fileid).await? {
        Some(view) => view,
        None => return Ok(StatusCode::NOT_FOUND.into_response()),
    };

    let mut response = StatusCode::OK.into_response();
    let headers = response.headers_mut();
    headers.insert("name", header_value(&view.name)?);
    headers.insert("hash", header_value(&view.hash)?);
    headers.insert("creator", header_value(&view.creator)?);
    headers.insert("sysId", header_value(&view.sys_id)?);
    Ok(response)
}

/// Stored metadata is caller-supplied; reject values that cannot travel in
/// a response header instead of panicking.
fn header_value(value: &str) -> Result<HeaderValue, GatewayError> {
    HeaderValue::from_str(value)
        .map_err(|_| GatewayError::Storage(anyhow::anyhow!("metadata value not header-safe")))
}

/// `GET /testing` — stream the well-known legacy blob.
pub async fn get_testing(state: Arc<AppState>) -> Result<Response, GatewayError> {
    let retrieval = RetrievalService::new(state.store.clone());
    let stream = retrieval
        .by_name(LEGACY_BLOB_NAME)
        .await?
        .ok_or(GatewayError::NotFound)?;

    Ok((
        StatusCode::OK,
        [("content-type", "application/octet-stream")],
        Body::from_stream(stream),
    )
        .into_response())
}

/// `PUT /testing` — legacy write path.
///
/// Appends the body to a fixed file under the staging root.  Unlike its
/// ancestor this never terminates the process: every failure propagates as
/// an error response for this request only.
pub async fn put_testing(
    state: Arc<AppState>,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let meta = parse_meta(headers)?;
    debug!(file_name = ?meta.file_name, "legacy upload");

    state.staging.append_fixed(LEGACY_STAGING_FILE, &body)?;
    Ok(StatusCode::OK.into_response())
}
