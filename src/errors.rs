//! Gateway error types.
//!
//! Every variant maps to a stable error code and an HTTP status.  The enum
//! implements [`axum::response::IntoResponse`] so handlers can simply
//! return `Err(GatewayError::HashMismatch { .. })` and get the JSON error
//! envelope `{"error": <message>}` on the wire.
//!
//! Messages are deliberately generic: no internal paths, digests or stack
//! traces leak to the caller.  Context goes to the log instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes)
}

/// Errors surfaced by the gateway, from header parsing through commit.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Content-Type was present but not a parsable media type.
    #[error("cant parse content type")]
    MalformedContentType { value: String },

    /// Content-Type declared multipart/form-data without a boundary parameter.
    #[error("multipart boundary not defined")]
    MissingBoundary,

    /// Content-Range did not match `bytes <start>-<end>/<size>`.
    #[error("cant parse content range")]
    MalformedRange { value: String },

    /// Content-Disposition was present but carried no filename parameter.
    #[error("filename not defined in content disposition")]
    MissingFilename,

    /// The declared object name cannot be used as a staging path component.
    #[error("cant create local file")]
    InvalidStagingName { name: String },

    /// The upload body exceeds the configured size limit.
    #[error("upload exceeds the maximum allowed size")]
    TooLarge,

    /// The staged content's digest does not equal the client-declared hash.
    #[error("content hash mismatch")]
    HashMismatch { declared: String, computed: String },

    /// Lookup miss.
    #[error("file not found")]
    NotFound,

    /// Backing store or staging I/O failure.
    #[error("storage failure")]
    Storage(#[from] anyhow::Error),
}

impl GatewayError {
    /// Return the stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::MalformedContentType { .. } => "MalformedContentType",
            GatewayError::MissingBoundary => "MissingBoundary",
            GatewayError::MalformedRange { .. } => "MalformedRange",
            GatewayError::MissingFilename => "MissingFilename",
            GatewayError::InvalidStagingName { .. } => "InvalidStagingName",
            GatewayError::TooLarge => "TooLarge",
            GatewayError::HashMismatch { .. } => "HashMismatch",
            GatewayError::NotFound => "NotFound",
            GatewayError::Storage(_) => "Storage",
        }
    }

    /// Return the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MalformedContentType { .. } => StatusCode::BAD_REQUEST,
            GatewayError::MissingBoundary => StatusCode::BAD_REQUEST,
            GatewayError::MalformedRange { .. } => StatusCode::BAD_REQUEST,
            GatewayError::MissingFilename => StatusCode::BAD_REQUEST,
            GatewayError::InvalidStagingName { .. } => StatusCode::BAD_REQUEST,
            GatewayError::TooLarge => StatusCode::BAD_REQUEST,
            GatewayError::HashMismatch { .. } => StatusCode::BAD_REQUEST,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let GatewayError::Storage(ref err) = self {
            tracing::error!(code = self.code(), error = %err, "request failed");
        } else {
            tracing::debug!(code = self.code(), "request rejected");
        }

        let body = serde_json::json!({ "error": self.to_string() }).to_string();

        (
            status,
            [("content-type", "application/json")],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_shape() {
        let id = generate_request_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GatewayError::MissingBoundary.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::HashMismatch {
                declared: "a".into(),
                computed: "b".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(GatewayError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            GatewayError::Storage(anyhow::anyhow!("disk on fire")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_stay_generic() {
        // The wire message must not echo the declared or computed digest.
        let err = GatewayError::HashMismatch {
            declared: "deadbeef".into(),
            computed: "cafebabe".into(),
        };
        let msg = err.to_string();
        assert!(!msg.contains("deadbeef"));
        assert!(!msg.contains("cafebabe"));

        let err = GatewayError::Storage(anyhow::anyhow!("/var/lib/secret/path"));
        assert!(!err.to_string().contains("/var/lib"));
    }
}
