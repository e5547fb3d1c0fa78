use axum::Json;
use axum::response::{IntoResponse, Response};
use ferry_llm::LlmError;
use http::StatusCode;
use serde::Serialize;

/// JSON error body: `{"error": {"message", "type", "code"}}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: &'static str,
    code: Option<&'static str>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>, error_type: &'static str, code: Option<&'static str>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                error_type,
                code,
            },
        }
    }
}

/// Gateway error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub LlmError);

impl From<LlmError> for ApiError {
    fn from(error: LlmError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, %status, "request failed");
        }

        let body = ErrorBody::new(self.0.client_message(), self.0.error_type(), self.0.code());
        (status, Json(body)).into_response()
    }
}

/// Fallback for unknown paths
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new("Not found", "not_found_error", None)),
    )
        .into_response()
}
