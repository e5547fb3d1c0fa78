//! Conversion between canonical types and Cloudflare Workers AI text generation

use ferry_config::ProviderKind;

use super::{arguments_text, decode_error};
use crate::error::LlmError;
use crate::protocol::workers_ai::{
    WorkersAiEnvelope, WorkersAiMessage, WorkersAiRequest, WorkersAiStreamChunk, WorkersAiTool,
};
use crate::stream::{StreamEvent, StreamTranslator, encode_tool_call_id};
use crate::types::{ChatRequest, ChatResponse, Role, ToolCall, Usage};

// -- Outbound: canonical request -> Workers AI wire format --

impl From<&ChatRequest> for WorkersAiRequest {
    fn from(req: &ChatRequest) -> Self {
        let messages = req
            .messages
            .iter()
            .filter_map(|msg| {
                let content = msg.text_content();
                match msg.role {
                    // tool-only turns have no text to replay
                    Role::Assistant if content.is_empty() => None,
                    Role::Assistant => Some(WorkersAiMessage {
                        role: "assistant".to_owned(),
                        content,
                    }),
                    // no separate system or tool channel
                    Role::System | Role::User | Role::Tool => Some(WorkersAiMessage {
                        role: "user".to_owned(),
                        content,
                    }),
                }
            })
            .collect();

        // function calling is only available on whole replies
        let tools: Vec<WorkersAiTool> = if req.stream {
            Vec::new()
        } else {
            req.tools()
                .iter()
                .map(|t| WorkersAiTool {
                    name: t.function.name.clone(),
                    description: t.function.description.clone().unwrap_or_default(),
                    parameters: t
                        .function
                        .parameters
                        .clone()
                        .unwrap_or_else(|| serde_json::json!({"type": "object"})),
                })
                .collect()
        };

        Self {
            messages,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            top_p: req.top_p,
            frequency_penalty: req.frequency_penalty,
            presence_penalty: req.presence_penalty,
            tools: (!tools.is_empty()).then_some(tools),
            stream: req.stream,
        }
    }
}

// -- Inbound: Workers AI reply -> canonical response --

/// Translate a whole Workers AI reply
///
/// # Errors
///
/// Returns [`LlmError::Upstream`] when the envelope reports a failure
pub fn chat_response(envelope: WorkersAiEnvelope, model: &str) -> Result<ChatResponse, LlmError> {
    let Some(result) = envelope.result.filter(|_| envelope.success) else {
        let message = envelope
            .errors
            .first()
            .map_or_else(|| "run failed".to_owned(), |e| e.message.clone());
        return Err(LlmError::Upstream {
            provider: ProviderKind::CloudflareAi,
            status: 500,
            message,
        });
    };

    let tool_calls = result
        .tool_calls
        .into_iter()
        .map(|call| ToolCall::new(encode_tool_call_id(None), call.name, arguments_text(&call.arguments)))
        .collect();
    let usage = result.usage.map(|u| Usage::new(u.prompt_tokens, u.completion_tokens));

    Ok(ChatResponse::assistant(
        model,
        result.response.unwrap_or_default(),
        tool_calls,
        usage,
    ))
}

// -- Stream conversion --

/// Translates Workers AI stream events (`{"response": "..."}` then `[DONE]`)
#[derive(Debug, Default)]
pub struct WorkersAiTranslator;

impl StreamTranslator for WorkersAiTranslator {
    fn translate(&mut self, data: &str) -> Result<Vec<StreamEvent>, LlmError> {
        if data == "[DONE]" {
            return Ok(vec![StreamEvent::Done]);
        }

        let chunk: WorkersAiStreamChunk =
            serde_json::from_str(data).map_err(|e| decode_error(ProviderKind::CloudflareAi, &e))?;

        Ok(chunk.response.map(StreamEvent::Text).into_iter().collect())
    }
}
