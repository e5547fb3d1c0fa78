//! Model resolution and ordered fallback across candidates

use std::sync::Arc;

use ferry_config::{ProviderConfig, RoutingTable, SecretStore};

use crate::error::{CandidateFailure, LlmError};
use crate::provider::{ChatOutput, ProviderFactory};
use crate::rotation::TokenManager;
use crate::types::ChatRequest;

/// Routes logical model names to an ordered chain of vendor candidates
#[derive(Clone)]
pub struct ModelRouter {
    table: Arc<RoutingTable>,
    factory: Arc<dyn ProviderFactory>,
    secrets: Arc<dyn SecretStore>,
}

impl ModelRouter {
    pub fn new(table: Arc<RoutingTable>, factory: Arc<dyn ProviderFactory>, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            table,
            factory,
            secrets,
        }
    }

    /// Candidates serving `model`
    ///
    /// An unknown model falls back to the first configured entry.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::NotConfigured`] when the routing table is empty
    pub fn resolve_candidates(&self, model: &str) -> Result<&[ProviderConfig], LlmError> {
        if let Some(candidates) = self.table.get(model) {
            return Ok(candidates);
        }

        match self.table.first() {
            Some((default_model, candidates)) => {
                tracing::info!(model, default_model, "no route for model, using default route");
                Ok(candidates)
            }
            None => Err(LlmError::NotConfigured {
                model: model.to_owned(),
            }),
        }
    }

    /// Execute a chat completion, trying candidates strictly in order
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::BadRequest`] for an invalid request,
    /// [`LlmError::NotConfigured`] for an empty table and
    /// [`LlmError::AllProvidersFailed`] once every candidate has failed
    pub async fn execute_with_fallback(&self, request: &ChatRequest) -> Result<ChatOutput, LlmError> {
        request.validate()?;

        let candidates = self.resolve_candidates(&request.model)?;
        tracing::info!(
            model = %request.model,
            candidates = candidates.len(),
            stream = request.stream,
            "routing chat completion"
        );

        let mut failures = Vec::with_capacity(candidates.len());

        for (attempt, config) in candidates.iter().enumerate() {
            tracing::info!(
                provider = %config.provider,
                model = %config.model,
                attempt = attempt + 1,
                of = candidates.len(),
                "trying provider"
            );

            match self.try_candidate(config, request).await {
                Ok(output) => {
                    tracing::info!(provider = %config.provider, model = %config.model, "provider succeeded");
                    return Ok(output);
                }
                Err(error) => {
                    tracing::warn!(provider = %config.provider, model = %config.model, error = %error, "provider failed");
                    failures.push(CandidateFailure {
                        provider: config.provider,
                        model: config.model.clone(),
                        error,
                    });
                }
            }
        }

        Err(LlmError::AllProvidersFailed { failures })
    }

    /// Logical model names, in table order
    pub fn available_models(&self) -> Vec<&str> {
        self.table.models().collect()
    }

    async fn try_candidate(&self, config: &ProviderConfig, request: &ChatRequest) -> Result<ChatOutput, LlmError> {
        let provider = self.factory.create(config)?;
        let request = request.with_model(&config.model);

        TokenManager::new(config, provider.as_ref(), self.secrets.as_ref())
            .execute_with_rotation(&request)
            .await
    }
}
