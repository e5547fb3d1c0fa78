//! HTTP boundary of the Ferry gateway
//!
//! Serves the health check, the model list and the `OpenAI`-compatible chat
//! completion endpoint in front of a [`ModelRouter`].

mod auth;
mod chat;
mod cors;
mod error;
mod health;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use ferry_config::ServerConfig;
use ferry_llm::ModelRouter;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ErrorBody};

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server around a model router
    pub fn new(config: ServerConfig, model_router: ModelRouter) -> Self {
        let token: auth::AuthToken = config.auth_token.map(Arc::new);
        if token.is_none() {
            tracing::warn!("no proxy auth token configured, chat endpoints are unauthenticated");
        }

        // Chat completions, guarded by the shared token
        let chat = post(chat::chat_completions).layer(axum::middleware::from_fn_with_state(
            token,
            auth::auth_middleware,
        ));

        let mut app = Router::new()
            .route("/", get(health::health_handler).merge(chat.clone()))
            .route("/health", get(health::health_handler))
            .route("/models", get(models::list_models))
            .route("/v1/models", get(models::list_models))
            .route("/v1/chat/completions", chat.clone())
            .route("/chat/completions", chat)
            .fallback(error::not_found)
            .with_state(model_router);

        // Apply middleware layers (innermost first)
        app = app.layer(TraceLayer::new_for_http());
        app = app.layer(cors::cors_layer());

        Self {
            router: app,
            listen_address: config.listen_address,
        }
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
