//! Error types for cluehunt-server
//!
//! [`HuntError`] is what the engine and config store return. [`ApiError`]
//! is its HTTP face: every variant maps to a status code and a stable
//! `code` string in the JSON error body.
//!
//! Geofence and similarity misses are not errors. They come back as
//! ordinary outcomes from the engine.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Engine and config store failures
#[derive(Debug, Error)]
pub enum HuntError {
    /// Team has no progress record yet
    #[error("Team '{0}' has not joined the hunt")]
    NotJoined(String),

    /// Submission names a clue other than the team's current one
    #[error("Submission for clue '{submitted}' but team is at clue '{expected}'")]
    StaleSubmission { expected: String, submitted: String },

    /// Unknown clue id
    #[error("Invalid clue: {0}")]
    InvalidClue(String),

    /// Clue needs a photo but has no usable reference image on disk
    #[error("Reference image missing for clue '{0}'")]
    ReferenceImageMissing(String),

    /// Uploaded or reference image could not be decoded
    #[error("Image decode failure: {0}")]
    Decode(String),

    /// Clue id already taken
    #[error("Clue id already exists: {0}")]
    ClueExists(String),

    /// Malformed admin or player input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Background task failed (e.g. a scoring task panicked)
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// cluehunt-common error
    #[error("Common error: {0}")]
    Common(#[from] cluehunt_common::Error),
}

impl From<serde_json::Error> for HuntError {
    fn from(err: serde_json::Error) -> Self {
        HuntError::Common(err.into())
    }
}

/// Result type for engine and store operations
pub type HuntResult<T> = Result<T, HuntError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Team must join first (400)
    #[error("{0}")]
    NotJoined(String),

    /// Client is out of sync with the team's current clue (400)
    #[error("{0}")]
    StaleSubmission(String),

    /// Unknown clue referenced by a submission or admin call (400)
    #[error("{0}")]
    InvalidClue(String),

    /// Upload could not be decoded (400)
    #[error("{0}")]
    DecodeFailure(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or wrong admin token (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Server-side configuration problem (500)
    #[error("{0}")]
    ReferenceImageMissing(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<HuntError> for ApiError {
    fn from(err: HuntError) -> Self {
        let message = err.to_string();
        match err {
            HuntError::NotJoined(_) => ApiError::NotJoined(message),
            HuntError::StaleSubmission { .. } => ApiError::StaleSubmission(message),
            HuntError::InvalidClue(_) => ApiError::InvalidClue(message),
            HuntError::ReferenceImageMissing(_) => ApiError::ReferenceImageMissing(message),
            HuntError::Decode(_) => ApiError::DecodeFailure(message),
            HuntError::ClueExists(_) => ApiError::Conflict(message),
            HuntError::InvalidInput(msg) => ApiError::BadRequest(msg),
            HuntError::Common(cluehunt_common::Error::InvalidInput(msg)) => {
                ApiError::BadRequest(msg)
            }
            HuntError::Common(cluehunt_common::Error::NotFound(msg)) => ApiError::NotFound(msg),
            HuntError::Internal(_) | HuntError::Io(_) | HuntError::Common(_) => {
                ApiError::Internal(message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::NotJoined(_) => (StatusCode::BAD_REQUEST, "NOT_JOINED"),
            ApiError::StaleSubmission(_) => (StatusCode::BAD_REQUEST, "STALE_SUBMISSION"),
            ApiError::InvalidClue(_) => (StatusCode::BAD_REQUEST, "INVALID_CLUE"),
            ApiError::DecodeFailure(_) => (StatusCode::BAD_REQUEST, "DECODE_FAILURE"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::ReferenceImageMissing(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "REFERENCE_IMAGE_MISSING",
            ),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_submission_maps_to_bad_request() {
        let err: ApiError = HuntError::StaleSubmission {
            expected: "c2".to_string(),
            submitted: "c1".to_string(),
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_reference_image_missing_is_server_error() {
        let err: ApiError = HuntError::ReferenceImageMissing("c1".to_string()).into();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_clue_exists_is_conflict() {
        let err: ApiError = HuntError::ClueExists("c1".to_string()).into();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
