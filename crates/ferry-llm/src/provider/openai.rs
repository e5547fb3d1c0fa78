//! `OpenAI` chat completions adapter, also used for compatible endpoints

use async_trait::async_trait;
use ferry_config::ProviderKind;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use super::{ChatOutput, ChatProvider, endpoint, read_json, send};
use crate::convert::openai::{OpenAiTranslator, chat_response};
use crate::error::LlmError;
use crate::stream::{StreamSession, spawn_translation};
use crate::types::ChatRequest;

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// `OpenAI` (or compatible) chat completions adapter
pub struct OpenAiProvider {
    kind: ProviderKind,
    client: Client,
    url: String,
}

impl OpenAiProvider {
    /// Adapter for the `OpenAI` API, or a replacement base URL
    pub fn new(client: Client, base_url: Option<&Url>) -> Self {
        Self {
            kind: ProviderKind::Openai,
            client,
            url: endpoint(base_url, DEFAULT_BASE_URL, "chat/completions"),
        }
    }

    /// Adapter for a self-hosted `OpenAI`-compatible endpoint
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] without a base URL
    pub fn compatible(client: Client, base_url: Option<&Url>) -> Result<Self, LlmError> {
        let base_url = base_url
            .ok_or_else(|| LlmError::InvalidConfig("openai-compatible provider requires baseUrl".to_owned()))?;

        Ok(Self {
            kind: ProviderKind::OpenaiCompatible,
            client,
            url: endpoint(Some(base_url), DEFAULT_BASE_URL, "chat/completions"),
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> ProviderKind {
        self.kind
    }

    fn requires_credential(&self) -> bool {
        // self-hosted endpoints often run without auth
        self.kind == ProviderKind::Openai
    }

    async fn chat(&self, request: &ChatRequest, credential: Option<&SecretString>) -> Result<ChatOutput, LlmError> {
        let mut builder = self.client.post(&self.url).json(request);
        if let Some(key) = credential {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = send(self.kind, builder).await?;

        if request.stream {
            let stream = spawn_translation(
                response.bytes_stream(),
                OpenAiTranslator::new(self.kind),
                StreamSession::new(&request.model),
                self.kind,
            );
            return Ok(ChatOutput::Stream(stream));
        }

        let body: Value = read_json(self.kind, response).await?;
        Ok(ChatOutput::Complete(chat_response(body, self.kind)?))
    }
}
