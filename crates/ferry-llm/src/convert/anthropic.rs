//! Conversion between canonical types and the Anthropic Messages API

use std::collections::HashMap;

use ferry_config::ProviderKind;

use super::{arguments_text, decode_error};
use crate::error::LlmError;
use crate::protocol::anthropic::{
    AnthropicContentBlock, AnthropicImageSource, AnthropicMessage, AnthropicRequest, AnthropicResponse,
    AnthropicResponseBlock, AnthropicStreamContentBlock, AnthropicStreamDelta, AnthropicStreamEvent, AnthropicTool,
    AnthropicToolChoice,
};
use crate::stream::{StreamEvent, StreamTranslator};
use crate::types::{
    ChatRequest, ChatResponse, Content, ContentPart, Message, Role, ToolCall, ToolChoice, ToolChoiceMode, Usage,
};

/// Default max tokens when not specified (Anthropic requires this field)
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

// -- Outbound: canonical request -> Anthropic wire format --

impl From<&ChatRequest> for AnthropicRequest {
    fn from(req: &ChatRequest) -> Self {
        let mut system = None;
        let mut messages: Vec<AnthropicMessage> = Vec::new();

        for msg in &req.messages {
            match msg.role {
                // A later system message replaces an earlier one
                Role::System => system = Some(msg.text_content()),
                Role::Tool => push_tool_result(&mut messages, msg),
                Role::User | Role::Assistant => {
                    let content = content_blocks(msg);
                    if !content.is_empty() {
                        let role = if msg.role == Role::Assistant { "assistant" } else { "user" };
                        messages.push(AnthropicMessage {
                            role: role.to_owned(),
                            content,
                        });
                    }
                }
            }
        }

        let tools: Vec<AnthropicTool> = req
            .tools()
            .iter()
            .map(|t| AnthropicTool {
                name: t.function.name.clone(),
                description: t.function.description.clone(),
                input_schema: t
                    .function
                    .parameters
                    .clone()
                    .unwrap_or_else(|| serde_json::json!({"type": "object"})),
            })
            .collect();

        let tool_choice = if tools.is_empty() {
            None
        } else {
            req.tool_choice.as_ref().map(tool_choice_to_anthropic)
        };

        Self {
            model: req.model.clone(),
            max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            temperature: req.temperature,
            top_p: req.top_p,
            stop_sequences: req.stop_sequences(),
            stream: req.stream.then_some(true),
            tools: (!tools.is_empty()).then_some(tools),
            tool_choice,
        }
    }
}

/// Append a tool result, sharing the user turn with directly preceding results
fn push_tool_result(messages: &mut Vec<AnthropicMessage>, msg: &Message) {
    let block = AnthropicContentBlock::ToolResult {
        tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
        content: msg.text_content(),
    };

    if let Some(last) = messages.last_mut()
        && last.role == "user"
        && last
            .content
            .iter()
            .all(|b| matches!(b, AnthropicContentBlock::ToolResult { .. }))
    {
        last.content.push(block);
        return;
    }

    messages.push(AnthropicMessage {
        role: "user".to_owned(),
        content: vec![block],
    });
}

/// Text, image and replayed `tool_use` blocks of a user or assistant message
fn content_blocks(msg: &Message) -> Vec<AnthropicContentBlock> {
    let mut blocks = match &msg.content {
        None => Vec::new(),
        Some(Content::Text(text)) if text.is_empty() => Vec::new(),
        Some(Content::Text(text)) => vec![AnthropicContentBlock::Text { text: text.clone() }],
        Some(Content::Parts(parts)) => parts.iter().map(part_to_block).collect(),
    };

    blocks.extend(msg.tool_calls().iter().map(|tc| AnthropicContentBlock::ToolUse {
        id: tc.id.clone(),
        name: tc.function.name.clone(),
        input: tc.function.parsed_arguments(),
    }));

    blocks
}

fn part_to_block(part: &ContentPart) -> AnthropicContentBlock {
    match part {
        ContentPart::Text { text } => AnthropicContentBlock::Text { text: text.clone() },
        ContentPart::ImageUrl { image_url } => {
            let source = image_url.as_data_uri().map_or_else(
                || AnthropicImageSource::Url {
                    url: image_url.url.clone(),
                },
                |(media_type, data)| AnthropicImageSource::Base64 {
                    media_type: media_type.to_owned(),
                    data: data.to_owned(),
                },
            );
            AnthropicContentBlock::Image { source }
        }
    }
}

fn tool_choice_to_anthropic(choice: &ToolChoice) -> AnthropicToolChoice {
    let (choice_type, name) = match choice {
        ToolChoice::Mode(ToolChoiceMode::None) => ("none", None),
        ToolChoice::Mode(ToolChoiceMode::Auto) => ("auto", None),
        ToolChoice::Mode(ToolChoiceMode::Required) => ("any", None),
        ToolChoice::Function(func) => ("tool", Some(func.function.name.clone())),
    };

    AnthropicToolChoice {
        choice_type: choice_type.to_owned(),
        name,
    }
}

// -- Inbound: Anthropic reply -> canonical response --

/// Translate a whole Anthropic reply
pub fn chat_response(resp: AnthropicResponse, model: &str) -> ChatResponse {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in resp.content {
        match block {
            AnthropicResponseBlock::Text { text: fragment } => text.push_str(&fragment),
            AnthropicResponseBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall::new(id, name, arguments_text(&input)));
            }
            AnthropicResponseBlock::Other => {}
        }
    }

    let usage = resp.usage.map(|u| Usage::new(u.input_tokens, u.output_tokens));
    ChatResponse::assistant(model, text, tool_calls, usage)
}

// -- Stream conversion --

/// Translates Anthropic stream events
///
/// Tool calls are keyed by their `tool_use` id. Argument deltas only carry
/// the content block index, so open tool blocks are tracked by index.
#[derive(Debug, Default)]
pub struct AnthropicTranslator {
    tool_blocks: HashMap<u32, ToolBlock>,
}

#[derive(Debug)]
struct ToolBlock {
    id: String,
    has_args: bool,
}

impl AnthropicTranslator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamTranslator for AnthropicTranslator {
    fn translate(&mut self, data: &str) -> Result<Vec<StreamEvent>, LlmError> {
        let event: AnthropicStreamEvent =
            serde_json::from_str(data).map_err(|e| decode_error(ProviderKind::Anthropic, &e))?;

        let events = match event {
            AnthropicStreamEvent::ContentBlockStart {
                index,
                content_block: AnthropicStreamContentBlock::ToolUse { id, name },
            } => {
                self.tool_blocks.insert(
                    index,
                    ToolBlock {
                        id: id.clone(),
                        has_args: false,
                    },
                );
                vec![StreamEvent::ToolCallStart {
                    key: id.clone(),
                    id,
                    name,
                }]
            }
            AnthropicStreamEvent::ContentBlockStart {
                content_block: AnthropicStreamContentBlock::Text { text },
                ..
            }
            | AnthropicStreamEvent::ContentBlockDelta {
                delta: AnthropicStreamDelta::TextDelta { text },
                ..
            } => vec![StreamEvent::Text(text)],
            AnthropicStreamEvent::ContentBlockDelta {
                index,
                delta: AnthropicStreamDelta::InputJsonDelta { partial_json },
            } => match self.tool_blocks.get_mut(&index) {
                Some(block) => {
                    block.has_args |= !partial_json.is_empty();
                    vec![StreamEvent::ToolCallArgs {
                        key: block.id.clone(),
                        arguments: partial_json,
                    }]
                }
                None => Vec::new(),
            },
            AnthropicStreamEvent::ContentBlockStop { index } => match self.tool_blocks.remove(&index) {
                // argument-less calls still need valid JSON
                Some(block) if !block.has_args => vec![StreamEvent::ToolCallArgs {
                    key: block.id,
                    arguments: "{}".to_owned(),
                }],
                _ => Vec::new(),
            },
            AnthropicStreamEvent::MessageStop => vec![StreamEvent::Done],
            AnthropicStreamEvent::Error { error } => {
                return Err(LlmError::Transport {
                    provider: ProviderKind::Anthropic,
                    message: format!("{}: {}", error.error_type, error.message),
                });
            }
            AnthropicStreamEvent::MessageStart { .. }
            | AnthropicStreamEvent::ContentBlockStart { .. }
            | AnthropicStreamEvent::ContentBlockDelta { .. }
            | AnthropicStreamEvent::MessageDelta { .. }
            | AnthropicStreamEvent::Ping
            | AnthropicStreamEvent::Other => Vec::new(),
        };

        Ok(events)
    }
}
