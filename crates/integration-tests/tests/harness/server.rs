//! Test server wrapper that starts Ferry on a random port

use std::net::SocketAddr;
use std::sync::Arc;

use ferry_config::{MapSecretStore, RoutingTable, ServerConfig};
use ferry_llm::{HttpProviderFactory, ModelRouter};
use ferry_server::Server;
use tokio_util::sync::CancellationToken;

/// Token expected by every test server
pub const AUTH_TOKEN: &str = "test-proxy-token";

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    /// Start a test server over the given routes and secrets
    ///
    /// Binds to port 0 for automatic port assignment
    pub async fn start(table: RoutingTable, secrets: MapSecretStore) -> anyhow::Result<Self> {
        let secrets = Arc::new(secrets);
        let factory = HttpProviderFactory::new(reqwest::Client::new(), secrets.clone());
        let router = ModelRouter::new(Arc::new(table), Arc::new(factory), secrets);

        let config = ServerConfig {
            auth_token: Some(AUTH_TOKEN.into()),
            ..ServerConfig::default()
        };
        let server = Server::new(config, router);

        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        // Bind the listener here so we know the actual port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, server.into_router())
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            shutdown,
            client: reqwest::Client::new(),
        })
    }

    /// URL of `path` on the running server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST an authenticated chat completion
    pub async fn chat(&self, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/v1/chat/completions"))
            .bearer_auth(AUTH_TOKEN)
            .json(body)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Collect the `data:` payloads of an SSE body
pub fn sse_payloads(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(str::to_owned)
        .collect()
}
