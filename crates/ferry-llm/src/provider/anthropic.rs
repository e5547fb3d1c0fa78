//! Anthropic Messages API adapter

use async_trait::async_trait;
use ferry_config::ProviderKind;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{ChatOutput, ChatProvider, endpoint, read_json, send};
use crate::convert::anthropic::{AnthropicTranslator, chat_response};
use crate::error::LlmError;
use crate::protocol::anthropic::{AnthropicRequest, AnthropicResponse};
use crate::stream::{StreamSession, spawn_translation};
use crate::types::ChatRequest;

/// Default Anthropic API base URL
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API adapter
pub struct AnthropicProvider {
    client: Client,
    url: String,
}

impl AnthropicProvider {
    pub fn new(client: Client, base_url: Option<&Url>) -> Self {
        Self {
            client,
            url: endpoint(base_url, DEFAULT_BASE_URL, "messages"),
        }
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn name(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn chat(&self, request: &ChatRequest, credential: Option<&SecretString>) -> Result<ChatOutput, LlmError> {
        let wire_request = AnthropicRequest::from(request);

        let mut builder = self
            .client
            .post(&self.url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&wire_request);
        if let Some(key) = credential {
            builder = builder.header("x-api-key", key.expose_secret());
        }

        let response = send(ProviderKind::Anthropic, builder).await?;

        if request.stream {
            let stream = spawn_translation(
                response.bytes_stream(),
                AnthropicTranslator::new(),
                StreamSession::new(&request.model),
                ProviderKind::Anthropic,
            );
            return Ok(ChatOutput::Stream(stream));
        }

        let wire_response: AnthropicResponse = read_json(ProviderKind::Anthropic, response).await?;
        Ok(ChatOutput::Complete(chat_response(wire_response, &request.model)))
    }
}
