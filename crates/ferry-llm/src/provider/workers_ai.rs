//! Cloudflare Workers AI adapter

use async_trait::async_trait;
use ferry_config::{ProviderKind, SecretStore};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{ChatOutput, ChatProvider, read_json, send};
use crate::convert::workers_ai::{WorkersAiTranslator, chat_response};
use crate::error::LlmError;
use crate::protocol::workers_ai::{WorkersAiEnvelope, WorkersAiRequest};
use crate::stream::{StreamSession, spawn_translation};
use crate::types::ChatRequest;

/// Cloudflare API base URL
const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Secret reference holding the account id when the candidate names none
pub const DEFAULT_ACCOUNT_REF: &str = "CLOUDFLARE_ACCOUNT_ID";

/// Cloudflare Workers AI adapter
pub struct WorkersAiProvider {
    client: Client,
    run_url: String,
}

impl WorkersAiProvider {
    /// Create the adapter
    ///
    /// A configured base URL replaces the whole `.../accounts/{id}/ai/run`
    /// prefix; otherwise the account id is resolved through `secrets`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] when neither a base URL nor an
    /// account id is available
    pub fn new(
        client: Client,
        base_url: Option<&Url>,
        account_ref: Option<&str>,
        secrets: &dyn SecretStore,
    ) -> Result<Self, LlmError> {
        let run_url = if let Some(base_url) = base_url {
            base_url.as_str().trim_end_matches('/').to_owned()
        } else {
            let account_ref = account_ref.unwrap_or(DEFAULT_ACCOUNT_REF);
            let account = secrets.resolve(account_ref).ok_or_else(|| {
                LlmError::InvalidConfig(format!("cloudflare-ai provider requires an account id in `{account_ref}`"))
            })?;
            format!("{DEFAULT_BASE_URL}/accounts/{}/ai/run", account.expose_secret())
        };

        Ok(Self { client, run_url })
    }
}

#[async_trait]
impl ChatProvider for WorkersAiProvider {
    fn name(&self) -> ProviderKind {
        ProviderKind::CloudflareAi
    }

    fn requires_credential(&self) -> bool {
        false
    }

    async fn chat(&self, request: &ChatRequest, credential: Option<&SecretString>) -> Result<ChatOutput, LlmError> {
        let wire_request = WorkersAiRequest::from(request);

        let mut builder = self
            .client
            .post(format!("{}/{}", self.run_url, request.model))
            .json(&wire_request);
        if let Some(token) = credential {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = send(ProviderKind::CloudflareAi, builder).await?;

        if request.stream {
            let stream = spawn_translation(
                response.bytes_stream(),
                WorkersAiTranslator,
                StreamSession::new(&request.model),
                ProviderKind::CloudflareAi,
            );
            return Ok(ChatOutput::Stream(stream));
        }

        let envelope: WorkersAiEnvelope = read_json(ProviderKind::CloudflareAi, response).await?;
        Ok(ChatOutput::Complete(chat_response(envelope, &request.model)?))
    }
}
