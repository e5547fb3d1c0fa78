use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use ferry_llm::LlmError;
use secrecy::{ExposeSecret, SecretString};

use crate::error::ApiError;

/// Shared token guarding the chat endpoints; `None` disables the check
pub type AuthToken = Option<Arc<SecretString>>;

/// Reject requests whose `Authorization` header does not carry the token
///
/// Both `Bearer <token>` and the bare token are accepted.
pub async fn auth_middleware(State(token): State<AuthToken>, request: Request, next: Next) -> Response {
    let Some(expected) = token else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v));

    if presented == Some(expected.expose_secret()) {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "rejected request with missing or invalid token");
    ApiError(LlmError::Unauthorized).into_response()
}
