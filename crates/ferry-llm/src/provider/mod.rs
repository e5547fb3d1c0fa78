//! Provider trait and HTTP adapters for the supported vendors

pub mod anthropic;
pub mod google;
pub mod openai;
pub mod workers_ai;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ferry_config::{ProviderConfig, ProviderKind, SecretStore};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::Value;

use self::anthropic::AnthropicProvider;
use self::google::GoogleProvider;
use self::openai::OpenAiProvider;
use self::workers_ai::WorkersAiProvider;
use crate::convert::decode_error;
use crate::error::LlmError;
use crate::stream::ChatStream;
use crate::types::{ChatRequest, ChatResponse};

/// Result of a successful chat call
pub enum ChatOutput {
    /// Whole reply
    Complete(ChatResponse),
    /// Live canonical SSE byte stream
    Stream(ChatStream),
}

impl fmt::Debug for ChatOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete(response) => f.debug_tuple("Complete").field(response).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Trait implemented by each vendor adapter
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Vendor served by this adapter
    fn name(&self) -> ProviderKind;

    /// Whether a call without a credential is pointless
    fn requires_credential(&self) -> bool {
        true
    }

    /// Send one chat completion to the vendor
    ///
    /// `request.model` is the vendor-side model name. Streaming requests
    /// return once the vendor has accepted the call; translation of the
    /// stream continues in the background.
    async fn chat(&self, request: &ChatRequest, credential: Option<&SecretString>) -> Result<ChatOutput, LlmError>;
}

/// Builds adapters for routing candidates
pub trait ProviderFactory: Send + Sync {
    /// Create the adapter for one candidate
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] when the candidate cannot be served
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn ChatProvider>, LlmError>;
}

/// Factory for the HTTP adapters, sharing one connection pool
#[derive(Clone)]
pub struct HttpProviderFactory {
    client: Client,
    secrets: Arc<dyn SecretStore>,
}

impl HttpProviderFactory {
    pub fn new(client: Client, secrets: Arc<dyn SecretStore>) -> Self {
        Self { client, secrets }
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn ChatProvider>, LlmError> {
        let client = self.client.clone();
        let base_url = config.base_url.as_ref();

        let provider: Box<dyn ChatProvider> = match config.provider {
            ProviderKind::Openai => Box::new(OpenAiProvider::new(client, base_url)),
            ProviderKind::OpenaiCompatible => Box::new(OpenAiProvider::compatible(client, base_url)?),
            ProviderKind::Anthropic => Box::new(AnthropicProvider::new(client, base_url)),
            ProviderKind::Google => Box::new(GoogleProvider::new(client, base_url, config.grounding)),
            ProviderKind::CloudflareAi => Box::new(WorkersAiProvider::new(
                client,
                base_url,
                config.account_id.as_deref(),
                self.secrets.as_ref(),
            )?),
        };

        Ok(provider)
    }
}

/// Join a configured or default base URL with an endpoint path
pub(crate) fn endpoint(base_url: Option<&url::Url>, default_base: &str, path: &str) -> String {
    let base = base_url.map_or(default_base, url::Url::as_str).trim_end_matches('/');
    format!("{base}/{path}")
}

/// Send a vendor request, turning failures into [`LlmError`]s
pub(crate) async fn send(provider: ProviderKind, builder: RequestBuilder) -> Result<Response, LlmError> {
    let response = builder.send().await.map_err(|e| {
        tracing::error!(%provider, error = %e, "upstream request failed");
        transport_error(provider, &e)
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%provider, %status, "upstream returned error");
        return Err(LlmError::Upstream {
            provider,
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    Ok(response)
}

/// Read and decode a whole JSON reply
pub(crate) async fn read_json<T: DeserializeOwned>(provider: ProviderKind, response: Response) -> Result<T, LlmError> {
    let body = response.bytes().await.map_err(|e| transport_error(provider, &e))?;
    serde_json::from_slice(&body).map_err(|e| decode_error(provider, &e))
}

fn transport_error(provider: ProviderKind, err: &reqwest::Error) -> LlmError {
    let message = if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        err.to_string()
    };
    LlmError::Transport { provider, message }
}

/// Human-readable message of a vendor error body
///
/// Vendors nest it under `error.message` (`OpenAI`, Anthropic, Google) or
/// `errors[0].message` (Cloudflare); anything else is returned as is.
pub(crate) fn error_message(body: &str) -> String {
    let body = body.trim();

    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .or_else(|| value.pointer("/errors/0/message"))
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                "empty error body".to_owned()
            } else {
                body.to_owned()
            }
        })
}
