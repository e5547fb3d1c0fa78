//! Scripted vendor backend for integration tests
//!
//! Answers every path with the next scripted reply (or the default one) and
//! records what it was sent, so tests can assert on wire translation,
//! credential order and call counts.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// One canned reply
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    content_type: &'static str,
    body: String,
}

impl Reply {
    pub fn json(body: &Value) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn error(status: u16, body: &Value) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            ..Self::json(body)
        }
    }

    /// SSE reply, one `data:` event per payload
    pub fn sse<I, S>(payloads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let body = payloads
            .into_iter()
            .map(|p| format!("data: {}\n\n", p.as_ref()))
            .collect();
        Self {
            status: StatusCode::OK,
            content_type: "text/event-stream",
            body,
        }
    }
}

/// A request as the vendor saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

struct VendorState {
    script: Mutex<VecDeque<Reply>>,
    default: Reply,
    requests: Mutex<Vec<Recorded>>,
}

/// Mock vendor listening on a random local port
pub struct MockVendor {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<VendorState>,
}

impl MockVendor {
    /// Start a vendor that always answers with `default`
    pub async fn start(default: Reply) -> anyhow::Result<Self> {
        Self::scripted([], default).await
    }

    /// Start a vendor that plays `script` in order, then `default`
    pub async fn scripted(script: impl IntoIterator<Item = Reply>, default: Reply) -> anyhow::Result<Self> {
        let state = Arc::new(VendorState {
            script: Mutex::new(script.into_iter().collect()),
            default,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL to put in a candidate's `baseUrl`
    pub fn base_url(&self, prefix: &str) -> String {
        format!("http://{}{prefix}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }
}

impl Drop for MockVendor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(State(state): State<Arc<VendorState>>, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    state.requests.lock().unwrap().push(Recorded {
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let reply = state
        .script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| state.default.clone());

    (reply.status, [(header::CONTENT_TYPE, reply.content_type)], reply.body).into_response()
}
