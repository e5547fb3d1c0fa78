use serde::{Deserialize, Serialize};

use super::message::Message;
use super::tool::{ToolChoice, ToolDefinition};
use crate::error::LlmError;

/// Stop sequences, accepted as a single string or an array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    /// One stop sequence
    One(String),
    /// Several stop sequences
    Many(Vec<String>),
}

impl StopSequences {
    /// Normalize to a list
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(stop) => vec![stop.clone()],
            Self::Many(stops) => stops.clone(),
        }
    }
}

/// Canonical chat completion request
///
/// `model` and `messages` default to empty so that their absence is
/// reported by [`ChatRequest::validate`] instead of a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Logical model name
    #[serde(default)]
    pub model: String,
    /// Conversation messages
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequences>,
    /// Frequency penalty (-2.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// Presence penalty (-2.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    /// Tool definitions available to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// How the model should select tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// Check the mandatory fields
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::BadRequest`] when the model name or the message
    /// list is missing
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.model.trim().is_empty() {
            return Err(LlmError::BadRequest("model is required".to_owned()));
        }
        if self.messages.is_empty() {
            return Err(LlmError::BadRequest("messages array is required".to_owned()));
        }
        Ok(())
    }

    /// Stop sequences as a list
    pub fn stop_sequences(&self) -> Option<Vec<String>> {
        self.stop.as_ref().map(StopSequences::to_vec)
    }

    /// Tool definitions, empty when absent
    pub fn tools(&self) -> &[ToolDefinition] {
        self.tools.as_deref().unwrap_or_default()
    }

    /// Copy of the request addressed to a vendor-side model name
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_owned(),
            ..self.clone()
        }
    }
}
