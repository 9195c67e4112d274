use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Every way an upload run can fail. The payload is internal detail for the
/// logs; clients only ever see the generic message for the variant.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("I/O failure: {0}")]
    IoFailure(String),

    #[error("Media analysis failed: {0}")]
    AnalysisFailure(String),

    #[error("Media transcode failed: {0}")]
    TranscodeFailure(String),

    #[error("Object storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Failed to persist record: {0}")]
    PersistFailure(String),
}

impl AppError {
    /// Stable machine-readable name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidIdentifier(_) => "InvalidIdentifier",
            AppError::MalformedRequest(_) => "MalformedRequest",
            AppError::AuthFailure(_) => "AuthFailure",
            AppError::UnsupportedMediaType(_) => "UnsupportedMediaType",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::IoFailure(_) => "IOFailure",
            AppError::AnalysisFailure(_) => "AnalysisFailure",
            AppError::TranscodeFailure(_) => "TranscodeFailure",
            AppError::StorageUnavailable(_) => "StorageUnavailable",
            AppError::RecordNotFound(_) => "RecordNotFound",
            AppError::PersistFailure(_) => "PersistFailure",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidIdentifier(_)
            | AppError::MalformedRequest(_)
            | AppError::UnsupportedMediaType(_) => StatusCode::BAD_REQUEST,
            AppError::AuthFailure(_) => StatusCode::UNAUTHORIZED,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::IoFailure(_)
            | AppError::AnalysisFailure(_)
            | AppError::TranscodeFailure(_)
            | AppError::StorageUnavailable(_)
            | AppError::RecordNotFound(_)
            | AppError::PersistFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            AppError::InvalidIdentifier(_) => "Invalid ID",
            AppError::MalformedRequest(_) => "Unable to parse form file",
            AppError::AuthFailure(_) => "Unauthorized",
            AppError::UnsupportedMediaType(_) => "Unsupported media type",
            AppError::PayloadTooLarge(_) => "Request body exceeds the maximum allowed limit",
            AppError::IoFailure(_) => "Unable to process upload",
            AppError::AnalysisFailure(_) => "Unable to process upload",
            AppError::TranscodeFailure(_) => "Unable to convert upload",
            AppError::StorageUnavailable(_) => "Unable to store file",
            AppError::RecordNotFound(_) => "Unable to process this request",
            AppError::PersistFailure(_) => "Unable to update video",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
        } else {
            tracing::warn!(kind = self.kind(), "{}", self);
        }

        let body = Json(json!({
            "error": self.public_message(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}
