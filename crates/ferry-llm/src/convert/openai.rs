//! `OpenAI` replies are canonical already; only the finish reason is normalized

use bytes::Bytes;
use ferry_config::ProviderKind;
use serde_json::Value;

use super::decode_error;
use crate::error::LlmError;
use crate::stream::{ChunkIdentity, StreamEvent, StreamTranslator};
use crate::types::ChatResponse;

/// Decode an `OpenAI` reply, normalizing each choice's finish reason
///
/// A choice carrying tool calls finishes with `tool_calls`. A choice that
/// claims `tool_calls` without any, or reports a reason outside the
/// canonical set, finishes with `stop`.
///
/// # Errors
///
/// Returns [`LlmError::Decode`] when the body is not a chat completion
pub fn chat_response(mut body: Value, provider: ProviderKind) -> Result<ChatResponse, LlmError> {
    if let Some(choices) = body.get_mut("choices").and_then(Value::as_array_mut) {
        for choice in choices {
            normalize_finish_reason(choice);
        }
    }

    serde_json::from_value(body).map_err(|e| decode_error(provider, &e))
}

fn normalize_finish_reason(choice: &mut Value) {
    let has_tool_calls = choice
        .pointer("/message/tool_calls")
        .and_then(Value::as_array)
        .is_some_and(|calls| !calls.is_empty());

    let reason = if has_tool_calls {
        "tool_calls"
    } else {
        match choice.get("finish_reason").and_then(Value::as_str) {
            Some("length") => "length",
            Some("content_filter") => "content_filter",
            _ => "stop",
        }
    };

    if let Some(object) = choice.as_object_mut() {
        object.insert("finish_reason".to_owned(), Value::String(reason.to_owned()));
    }
}

/// Forwards `OpenAI` stream chunks verbatim
#[derive(Debug)]
pub struct OpenAiTranslator {
    provider: ProviderKind,
}

impl OpenAiTranslator {
    pub const fn new(provider: ProviderKind) -> Self {
        Self { provider }
    }
}

impl StreamTranslator for OpenAiTranslator {
    fn translate(&mut self, data: &str) -> Result<Vec<StreamEvent>, LlmError> {
        if data == "[DONE]" {
            return Ok(vec![StreamEvent::Done]);
        }

        let chunk: Value = serde_json::from_str(data).map_err(|e| decode_error(self.provider, &e))?;

        if let Some(error) = chunk.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("stream error")
                .to_owned();
            return Err(LlmError::Transport {
                provider: self.provider,
                message,
            });
        }

        let choices = chunk.get("choices").and_then(Value::as_array).map_or(&[][..], Vec::as_slice);
        let finished = choices
            .iter()
            .any(|c| c.get("finish_reason").is_some_and(|r| !r.is_null()));
        let tool_calls = choices.iter().any(|c| {
            c.pointer("/delta/tool_calls")
                .and_then(Value::as_array)
                .is_some_and(|calls| !calls.is_empty())
        });

        Ok(vec![StreamEvent::Raw {
            frame: Bytes::from(format!("data: {data}\n\n")),
            identity: chunk_identity(&chunk),
            tool_calls,
            finished,
        }])
    }
}

/// Identity of an upstream chunk, when it names both id and timestamp
fn chunk_identity(chunk: &Value) -> Option<ChunkIdentity> {
    let id = chunk.get("id").and_then(Value::as_str)?;
    let created = chunk.get("created").and_then(Value::as_u64)?;
    Some(ChunkIdentity {
        id: id.to_owned(),
        created,
        model: chunk.get("model").and_then(Value::as_str).map(str::to_owned),
    })
}
