use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chartdeck::UploadError;
use serde::{Deserialize, Serialize};
use store::StoreError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
///
/// The `Display` text of each variant is what clients see in `detail`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("File must be a CSV")]
    UnsupportedFileType,

    /// Anything that went wrong while handling an upload.
    #[error("Error processing CSV: {0}")]
    Upload(String),

    /// The request body was rejected by an extractor.
    #[error("{message}")]
    InvalidBody { status: StatusCode, message: String },

    #[error("Payload too large: max {0}MB allowed")]
    PayloadTooLarge(usize),

    /// A dataset lookup failed for a reason other than absence.
    #[error("{0}")]
    Lookup(StoreError),

    #[error("{0}")]
    NotFound(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Store unavailable: {0}")]
    Unavailable(StoreError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// API error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ServerError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ServerError::NotFound(what.into())
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::UnsupportedFileType
            | ServerError::Upload(_)
            | ServerError::Lookup(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidBody { status, .. } => *status,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Store(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::UnsupportedFileType => "UNSUPPORTED_FILE_TYPE",
            ServerError::Upload(_) => "UPLOAD_ERROR",
            ServerError::InvalidBody { .. } => "INVALID_BODY",
            ServerError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ServerError::Lookup(_) => "LOOKUP_ERROR",
            ServerError::NotFound(_) => "NOT_FOUND",
            ServerError::Timeout => "REQUEST_TIMEOUT",
            ServerError::Unavailable(_) => "STORE_UNAVAILABLE",
            ServerError::Store(_) => "STORE_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        if status.is_server_error() {
            tracing::error!(code = self.error_code(), status = %status, %detail, "request_failed");
        } else {
            tracing::debug!(code = self.error_code(), status = %status, %detail, "request_rejected");
        }

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

impl From<UploadError> for ServerError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::UnsupportedFileType(_) => ServerError::UnsupportedFileType,
            UploadError::Timeout(_) => ServerError::Timeout,
            other => ServerError::Upload(other.to_string()),
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for ServerError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        ServerError::InvalidBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<std::net::AddrParseError> for ServerError {
    fn from(err: std::net::AddrParseError) -> Self {
        ServerError::Config(format!("Invalid address: {err}"))
    }
}
