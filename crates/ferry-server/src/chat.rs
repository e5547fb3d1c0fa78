use std::convert::Infallible;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use ferry_llm::{ChatOutput, ChatRequest, ChatStream, LlmError, ModelRouter};
use futures_util::StreamExt;
use http::header::{CACHE_CONTROL, CONTENT_TYPE};

use crate::error::ApiError;

/// Handle `POST /v1/chat/completions`
pub async fn chat_completions(
    State(router): State<ModelRouter>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| LlmError::BadRequest(rejection.body_text()))?;
    tracing::info!(model = %request.model, stream = request.stream, "chat completion request");

    match router.execute_with_fallback(&request).await? {
        ChatOutput::Complete(response) => Ok(Json(response).into_response()),
        ChatOutput::Stream(stream) => Ok(stream_response(stream)),
    }
}

/// Forward an already framed SSE byte stream without buffering
fn stream_response(stream: ChatStream) -> Response {
    let body = Body::from_stream(stream.map(Ok::<_, Infallible>));

    (
        [(CONTENT_TYPE, "text/event-stream"), (CACHE_CONTROL, "no-cache")],
        body,
    )
        .into_response()
}
