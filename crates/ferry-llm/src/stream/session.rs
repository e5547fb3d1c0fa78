use std::collections::HashMap;

use bytes::Bytes;
use serde::Serialize;

use super::ChunkIdentity;
use crate::id;
use crate::types::{FinishReason, FunctionCallDelta, StreamChoice, StreamChunk, StreamDelta, ToolCallDelta};

/// Stream-end sentinel frame
pub const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

/// Per-request encoder of canonical stream frames
///
/// Every frame shares the session's completion id, creation timestamp and
/// model. Tool calls get a positional index the first time their vendor
/// key is seen; later references to the same key reuse it.
#[derive(Debug)]
pub struct StreamSession {
    id: String,
    created: u64,
    model: String,
    tool_indices: HashMap<String, u32>,
}

impl StreamSession {
    /// Start a session with a fresh identity
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_identity(id::completion_id(), id::unix_now(), model)
    }

    /// Start a session with an existing identity
    pub fn with_identity(id: impl Into<String>, created: u64, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created,
            model: model.into(),
            tool_indices: HashMap::new(),
        }
    }

    /// Take over the identity of an upstream stream
    ///
    /// Tool call indices assigned so far are kept.
    pub fn adopt_identity(&mut self, identity: ChunkIdentity) {
        self.id = identity.id;
        self.created = identity.created;
        if let Some(model) = identity.model {
            self.model = model;
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn created(&self) -> u64 {
        self.created
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Canonical index of a tool call, assigned on first sight
    #[allow(clippy::cast_possible_truncation)]
    pub fn tool_call_index(&mut self, key: &str) -> u32 {
        let next = self.tool_indices.len() as u32;
        *self.tool_indices.entry(key.to_owned()).or_insert(next)
    }

    /// Number of distinct tool calls seen so far
    pub fn tool_call_count(&self) -> usize {
        self.tool_indices.len()
    }

    /// Opening frame establishing the assistant role
    pub fn role_chunk(&self) -> Bytes {
        self.chunk(
            StreamDelta {
                role: Some("assistant".to_owned()),
                content: Some(String::new()),
                tool_calls: None,
            },
            None,
        )
    }

    pub fn text_chunk(&self, fragment: &str) -> Bytes {
        self.chunk(
            StreamDelta {
                content: Some(fragment.to_owned()),
                ..StreamDelta::default()
            },
            None,
        )
    }

    /// Announce a tool call with empty arguments
    pub fn tool_call_start_chunk(&self, index: u32, id: &str, name: &str) -> Bytes {
        self.tool_call_chunk(ToolCallDelta {
            index,
            id: Some(id.to_owned()),
            call_type: Some("function".to_owned()),
            function: FunctionCallDelta {
                name: Some(name.to_owned()),
                arguments: Some(String::new()),
            },
        })
    }

    /// Append a fragment to a tool call's arguments
    pub fn tool_call_args_chunk(&self, index: u32, fragment: &str) -> Bytes {
        self.tool_call_chunk(ToolCallDelta {
            index,
            id: None,
            call_type: None,
            function: FunctionCallDelta {
                name: None,
                arguments: Some(fragment.to_owned()),
            },
        })
    }

    pub fn finish_chunk(&self, reason: FinishReason) -> Bytes {
        self.chunk(StreamDelta::default(), Some(reason))
    }

    pub fn done(&self) -> Bytes {
        Bytes::from_static(DONE_FRAME)
    }

    fn tool_call_chunk(&self, delta: ToolCallDelta) -> Bytes {
        self.chunk(
            StreamDelta {
                tool_calls: Some(vec![delta]),
                ..StreamDelta::default()
            },
            None,
        )
    }

    fn chunk(&self, delta: StreamDelta, finish_reason: Option<FinishReason>) -> Bytes {
        frame(&StreamChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_owned(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![StreamChoice {
                index: 0,
                delta,
                finish_reason,
            }],
            usage: None,
        })
    }
}

/// Render a value as one `data: <json>\n\n` frame
pub fn frame<T: Serialize>(value: &T) -> Bytes {
    let json = serde_json::to_string(value).unwrap_or_default();
    Bytes::from(format!("data: {json}\n\n"))
}
