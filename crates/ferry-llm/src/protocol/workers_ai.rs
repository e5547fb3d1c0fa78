//! Cloudflare Workers AI text generation wire format types

use serde::{Deserialize, Serialize};

// -- Request types --

/// Workers AI `ai/run/{model}` request for chat models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkersAiRequest {
    /// Conversation messages
    pub messages: Vec<WorkersAiMessage>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Frequency penalty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// Presence penalty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    /// Function declarations (non-streaming only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WorkersAiTool>>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

/// Workers AI chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkersAiMessage {
    /// Role ("user" or "assistant")
    pub role: String,
    /// Text content
    pub content: String,
}

/// Workers AI function declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkersAiTool {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// JSON Schema for parameters
    pub parameters: serde_json::Value,
}

// -- Response types --

/// Workers AI response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersAiEnvelope {
    /// Model output
    #[serde(default)]
    pub result: Option<WorkersAiResult>,
    /// Whether the call succeeded
    #[serde(default)]
    pub success: bool,
    /// Errors reported by the platform
    #[serde(default)]
    pub errors: Vec<WorkersAiError>,
}

/// Model output of a text generation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkersAiResult {
    /// Generated text
    #[serde(default)]
    pub response: Option<String>,
    /// Function calls requested by the model
    #[serde(default)]
    pub tool_calls: Vec<WorkersAiToolCall>,
    /// Token usage
    #[serde(default)]
    pub usage: Option<WorkersAiUsage>,
}

/// Function call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersAiToolCall {
    /// Function name
    pub name: String,
    /// Function arguments as JSON
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Token usage
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkersAiUsage {
    /// Prompt tokens
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Completion tokens
    #[serde(default)]
    pub completion_tokens: u32,
}

/// Platform error entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersAiError {
    /// Error code
    #[serde(default)]
    pub code: u32,
    /// Error message
    pub message: String,
}

// -- Streaming types --

/// One SSE event of a streamed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersAiStreamChunk {
    /// Text fragment
    #[serde(default)]
    pub response: Option<String>,
}
