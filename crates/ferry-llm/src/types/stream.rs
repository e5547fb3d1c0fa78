use serde::{Deserialize, Serialize};

use super::response::{FinishReason, Usage};

/// One increment of an in-progress completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Completion identifier, constant across the stream
    pub id: String,
    /// Object type ("chat.completion.chunk")
    pub object: String,
    /// Unix timestamp, constant across the stream
    pub created: u64,
    /// Model name
    pub model: String,
    /// Partial choices (always one)
    pub choices: Vec<StreamChoice>,
    /// Usage statistics, when the vendor reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Partial choice within a stream chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChoice {
    /// Choice index
    pub index: u32,
    /// Incremental content
    pub delta: StreamDelta,
    /// Present on the terminal chunk only, null otherwise
    pub finish_reason: Option<FinishReason>,
}

/// Incremental update within a streaming response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamDelta {
    /// Role, present on the first chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Incremental text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Incremental tool call data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Partial tool call data within a stream delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Position of this tool call in the completion
    pub index: u32,
    /// Tool call ID (first chunk only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Always "function" (first chunk only)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    /// Partial function call data
    pub function: FunctionCallDelta,
}

/// Partial function call data within a streaming tool call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCallDelta {
    /// Function name (first chunk only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Incremental arguments JSON fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}
