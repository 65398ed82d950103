//! Upload handler: the atomic create endpoint.

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tracing::debug;

use crate::errors::GatewayError;
use crate::meta::parse_meta;
use crate::pipeline::{CommitOutcome, CommitPipeline};
use crate::AppState;

/// `PUT /commonfs/createAtomically` — verify and commit a single-shot upload.
///
/// Parses transport and property headers, runs the verified commit
/// pipeline, and reports `{"result":"success"}` for both a committed
/// object and the historical no-op on an incomplete property set.
pub async fn create_atomically(
    state: Arc<AppState>,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    if body.len() as u64 > state.config.server.max_object_size {
        return Err(GatewayError::TooLarge);
    }

    let meta = parse_meta(headers)?;

    let pipeline = CommitPipeline::new(state.staging.clone(), state.store.clone());
    match pipeline.commit_atomic(&meta, body).await? {
        CommitOutcome::Stored(record) => {
            debug!(reference = %record.reference, "upload committed");
        }
        CommitOutcome::Skipped { .. } => {
            // Historical behavior: the caller still sees "success".
        }
    }

    Ok((
        StatusCode::OK,
        [("content-type", "application/json")],
        r#"{"result":"success"}"#,
    )
        .into_response())
}
