//! Credential rotation for a single routing candidate

use ferry_config::{ProviderConfig, SecretStore};
use secrecy::{ExposeSecret, SecretString};

use crate::error::LlmError;
use crate::provider::{ChatOutput, ChatProvider};
use crate::types::ChatRequest;

/// Tries one candidate's credentials in order until one succeeds
pub struct TokenManager<'a> {
    config: &'a ProviderConfig,
    provider: &'a dyn ChatProvider,
    secrets: &'a dyn SecretStore,
}

impl<'a> TokenManager<'a> {
    pub fn new(config: &'a ProviderConfig, provider: &'a dyn ChatProvider, secrets: &'a dyn SecretStore) -> Self {
        Self {
            config,
            provider,
            secrets,
        }
    }

    /// Execute `request` against the candidate, rotating credentials
    ///
    /// A retryable failure moves on to the next credential; any other
    /// failure is returned at once. When every credential fails the last
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingCredentials`] when the vendor needs a
    /// credential and none resolves, otherwise the adapter's error
    pub async fn execute_with_rotation(&self, request: &ChatRequest) -> Result<ChatOutput, LlmError> {
        let provider = self.config.provider;
        let model = self.config.model.as_str();
        let keys = self.resolve_keys();

        if keys.is_empty() {
            if self.provider.requires_credential() {
                return Err(LlmError::MissingCredentials {
                    provider,
                    model: model.to_owned(),
                });
            }
            tracing::debug!(%provider, model, "calling without credential");
            return self.provider.chat(request, None).await;
        }

        let mut last_error = None;

        for (key_index, key) in keys.iter().enumerate() {
            let key_suffix = key_suffix(key);
            tracing::info!(%provider, model, key_index, key_suffix = %key_suffix, "trying credential");

            match self.provider.chat(request, Some(key)).await {
                Ok(output) => {
                    tracing::info!(%provider, model, key_index, key_suffix = %key_suffix, "credential succeeded");
                    return Ok(output);
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(%provider, model, key_index, key_suffix = %key_suffix, error = %e, "credential failed, rotating");
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::warn!(%provider, model, key_index, key_suffix = %key_suffix, error = %e, "credential failed");
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::MissingCredentials {
            provider,
            model: model.to_owned(),
        }))
    }

    /// Resolve credential references in order, skipping unknown ones
    fn resolve_keys(&self) -> Vec<SecretString> {
        self.config
            .api_keys
            .iter()
            .filter_map(|name| {
                let key = self.secrets.resolve(name);
                if key.is_none() {
                    tracing::warn!(provider = %self.config.provider, key_ref = %name, "API key reference not found");
                }
                key
            })
            .collect()
    }
}

/// Last four characters of a credential, masked entirely when it is too short
fn key_suffix(key: &SecretString) -> String {
    let key = key.expose_secret();
    if key.chars().count() < 8 {
        return "****".to_owned();
    }
    let start = key.char_indices().rev().nth(3).map_or(0, |(i, _)| i);
    key[start..].to_owned()
}
