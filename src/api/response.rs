use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

// ============================================================================
// Success envelope
// ============================================================================

/// `{"success": true, "message"?: ..., ...data}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

/// Payload for responses that carry nothing beyond the envelope.
#[derive(Debug, Serialize)]
pub struct Empty {}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<ApiResponse<T>> {
        Json(ApiResponse {
            success: true,
            message: None,
            data,
        })
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Json<ApiResponse<T>> {
        Json(ApiResponse {
            success: true,
            message: Some(message.into()),
            data,
        })
    }
}

// ============================================================================
// Failure envelope
// ============================================================================

/// `{"success": false, "message": ..., "error"?: ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn response(
        status_code: StatusCode,
        message: impl Into<String>,
        error: Option<String>,
    ) -> (StatusCode, Json<ErrorBody>) {
        (
            status_code,
            Json(ErrorBody {
                success: false,
                message: message.into(),
                error,
            }),
        )
    }
}

// ============================================================================
// Unified error type for handlers
// ============================================================================

/// Handler error: a client fail (4xx) or a server error (5xx) with detail.
#[derive(Debug)]
pub enum ApiError {
    Fail(StatusCode, String),
    Error(StatusCode, String, String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Fail(code, msg) => ErrorBody::response(code, msg, None).into_response(),
            ApiError::Error(code, msg, detail) => {
                tracing::error!(status = %code, error = %detail, "{msg}");
                ErrorBody::response(code, msg, Some(detail)).into_response()
            }
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::BAD_REQUEST, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::NOT_FOUND, message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::PAYLOAD_TOO_LARGE, message.into())
    }

    pub fn internal(message: impl Into<String>, detail: impl Into<String>) -> Self {
        ApiError::Error(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            detail.into(),
        )
    }
}
