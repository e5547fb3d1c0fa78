//! Google Gemini (Generative Language API) adapter

use async_trait::async_trait;
use ferry_config::ProviderKind;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{ChatOutput, ChatProvider, endpoint, read_json, send};
use crate::convert::google::{GoogleTranslator, chat_response};
use crate::error::LlmError;
use crate::protocol::google::{GoogleRequest, GoogleResponse};
use crate::stream::{StreamSession, spawn_translation};
use crate::types::ChatRequest;

/// Default Google Generative Language API base URL
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini adapter
pub struct GoogleProvider {
    client: Client,
    models_url: String,
    grounding: bool,
}

impl GoogleProvider {
    /// Create the adapter; `grounding` adds the Google Search tool to every call
    pub fn new(client: Client, base_url: Option<&Url>, grounding: bool) -> Self {
        Self {
            client,
            models_url: endpoint(base_url, DEFAULT_BASE_URL, "models"),
            grounding,
        }
    }

    fn url(&self, model: &str, stream: bool) -> String {
        if stream {
            format!("{}/{model}:streamGenerateContent?alt=sse", self.models_url)
        } else {
            format!("{}/{model}:generateContent", self.models_url)
        }
    }
}

#[async_trait]
impl ChatProvider for GoogleProvider {
    fn name(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn chat(&self, request: &ChatRequest, credential: Option<&SecretString>) -> Result<ChatOutput, LlmError> {
        let mut wire_request = GoogleRequest::from(request);
        if self.grounding {
            wire_request = wire_request.with_search_grounding();
        }

        let mut builder = self
            .client
            .post(self.url(&request.model, request.stream))
            .json(&wire_request);
        if let Some(key) = credential {
            builder = builder.header("x-goog-api-key", key.expose_secret());
        }

        let response = send(ProviderKind::Google, builder).await?;

        if request.stream {
            let stream = spawn_translation(
                response.bytes_stream(),
                GoogleTranslator::new(),
                StreamSession::new(&request.model),
                ProviderKind::Google,
            );
            return Ok(ChatOutput::Stream(stream));
        }

        let wire_response: GoogleResponse = read_json(ProviderKind::Google, response).await?;
        Ok(ChatOutput::Complete(chat_response(wire_response, &request.model)))
    }
}
