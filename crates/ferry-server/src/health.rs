use axum::Json;
use axum::response::IntoResponse;
use jiff::Timestamp;
use serde::Serialize;

/// Name reported by the health check
const SERVICE_NAME: &str = "ferry";

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    service: &'static str,
    timestamp: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(Health {
        status: "ok",
        service: SERVICE_NAME,
        timestamp: format!("{:.3}", Timestamp::now()),
    })
}
