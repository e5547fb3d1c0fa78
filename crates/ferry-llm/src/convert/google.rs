//! Conversion between canonical types and the Google Generative Language API
//!
//! Gemini attaches an opaque `thoughtSignature` to function calls and
//! rejects the next turn unless it is sent back. Canonical clients only keep
//! the tool call id, so the signature travels inside it (see
//! [`crate::stream::signature`]).

use ferry_config::ProviderKind;

use super::{arguments_text, decode_error};
use crate::error::LlmError;
use crate::protocol::google::{
    GoogleCandidate, GoogleContent, GoogleFunctionCall, GoogleFunctionCallingConfig, GoogleFunctionDeclaration,
    GoogleFunctionResponse, GoogleGenerationConfig, GoogleInlineData, GooglePart, GoogleRequest, GoogleResponse,
    GoogleSearch, GoogleTool, GoogleToolConfig,
};
use crate::stream::{StreamEvent, StreamTranslator, decode_thought_signature, encode_tool_call_id};
use crate::types::{
    ChatRequest, ChatResponse, Content, ContentPart, Message, Role, ToolCall, ToolChoice, ToolChoiceMode, Usage,
};

// -- Outbound: canonical request -> Google wire format --

impl From<&ChatRequest> for GoogleRequest {
    fn from(req: &ChatRequest) -> Self {
        let mut system_instruction = None;
        let mut contents: Vec<GoogleContent> = Vec::new();

        for msg in &req.messages {
            match msg.role {
                Role::System => {
                    system_instruction = Some(GoogleContent {
                        role: None,
                        parts: vec![GooglePart::text(msg.text_content())],
                    });
                }
                Role::User => contents.push(GoogleContent {
                    role: Some("user".to_owned()),
                    parts: user_parts(msg),
                }),
                Role::Assistant => {
                    let parts = model_parts(msg);
                    if !parts.is_empty() {
                        contents.push(GoogleContent {
                            role: Some("model".to_owned()),
                            parts,
                        });
                    }
                }
                Role::Tool => push_function_response(&mut contents, &req.messages, msg),
            }
        }

        let declarations: Vec<GoogleFunctionDeclaration> = req
            .tools()
            .iter()
            .map(|t| GoogleFunctionDeclaration {
                name: t.function.name.clone(),
                description: t.function.description.clone(),
                parameters: t.function.parameters.clone(),
            })
            .collect();

        let tool_config = if declarations.is_empty() {
            None
        } else {
            req.tool_choice.as_ref().map(tool_choice_to_google)
        };

        let tools = (!declarations.is_empty()).then(|| {
            vec![GoogleTool {
                function_declarations: Some(declarations),
                google_search: None,
            }]
        });

        let generation_config = GoogleGenerationConfig {
            temperature: req.temperature,
            top_p: req.top_p,
            max_output_tokens: req.max_tokens,
            stop_sequences: req.stop_sequences(),
            presence_penalty: req.presence_penalty,
            frequency_penalty: req.frequency_penalty,
        };

        Self {
            contents,
            system_instruction,
            generation_config: (generation_config != GoogleGenerationConfig::default()).then_some(generation_config),
            tools,
            tool_config,
        }
    }
}

impl GoogleRequest {
    /// Add the Google Search grounding tool
    #[must_use]
    pub fn with_search_grounding(mut self) -> Self {
        self.tools.get_or_insert_with(Vec::new).push(GoogleTool {
            function_declarations: None,
            google_search: Some(GoogleSearch {}),
        });
        self
    }
}

fn user_parts(msg: &Message) -> Vec<GooglePart> {
    match &msg.content {
        Some(Content::Parts(parts)) => parts.iter().map(part_to_google).collect(),
        _ => vec![GooglePart::text(msg.text_content())],
    }
}

fn part_to_google(part: &ContentPart) -> GooglePart {
    match part {
        ContentPart::Text { text } => GooglePart::text(text.clone()),
        ContentPart::ImageUrl { image_url } => match image_url.as_data_uri() {
            Some((mime_type, data)) => GooglePart {
                inline_data: Some(GoogleInlineData {
                    mime_type: mime_type.to_owned(),
                    data: data.to_owned(),
                }),
                ..GooglePart::default()
            },
            // only inline data is accepted without an upload step
            None => GooglePart::text(image_url.url.clone()),
        },
    }
}

/// Text and replayed function calls of an assistant turn
fn model_parts(msg: &Message) -> Vec<GooglePart> {
    let mut parts = Vec::new();

    let text = msg.text_content();
    if !text.is_empty() {
        parts.push(GooglePart::text(text));
    }

    parts.extend(msg.tool_calls().iter().map(|tc| GooglePart {
        function_call: Some(GoogleFunctionCall {
            name: tc.function.name.clone(),
            args: tc.function.parsed_arguments(),
        }),
        thought_signature: decode_thought_signature(&tc.id),
        ..GooglePart::default()
    }));

    parts
}

/// Append a function response, sharing the user turn with directly preceding responses
fn push_function_response(contents: &mut Vec<GoogleContent>, history: &[Message], msg: &Message) {
    let call_id = msg.tool_call_id.as_deref().unwrap_or_default();
    let name = originating_call_name(history, call_id).unwrap_or("unknown");

    let part = GooglePart {
        function_response: Some(GoogleFunctionResponse {
            name: name.to_owned(),
            response: serde_json::json!({ "content": msg.text_content() }),
        }),
        ..GooglePart::default()
    };

    if let Some(last) = contents.last_mut()
        && last.role.as_deref() == Some("user")
        && last.parts.iter().all(|p| p.function_response.is_some())
    {
        last.parts.push(part);
        return;
    }

    contents.push(GoogleContent {
        role: Some("user".to_owned()),
        parts: vec![part],
    });
}

/// Name of the most recent assistant tool call with the given id
fn originating_call_name<'a>(history: &'a [Message], call_id: &str) -> Option<&'a str> {
    history
        .iter()
        .rev()
        .flat_map(Message::tool_calls)
        .find(|tc| tc.id == call_id)
        .map(|tc| tc.function.name.as_str())
}

fn tool_choice_to_google(choice: &ToolChoice) -> GoogleToolConfig {
    let (mode, allowed_function_names) = match choice {
        ToolChoice::Mode(ToolChoiceMode::None) => ("NONE", None),
        ToolChoice::Mode(ToolChoiceMode::Auto) => ("AUTO", None),
        ToolChoice::Mode(ToolChoiceMode::Required) => ("ANY", None),
        ToolChoice::Function(func) => ("ANY", Some(vec![func.function.name.clone()])),
    };

    GoogleToolConfig {
        function_calling_config: GoogleFunctionCallingConfig {
            mode: mode.to_owned(),
            allowed_function_names,
        },
    }
}

// -- Inbound: Google reply -> canonical response --

/// Translate a whole Google reply
pub fn chat_response(resp: GoogleResponse, model: &str) -> ChatResponse {
    let parts = resp.candidates.first().map(GoogleCandidate::parts).unwrap_or_default();

    let text: String = parts.iter().filter_map(GooglePart::answer_text).collect();
    let tool_calls = parts
        .iter()
        .filter_map(|part| {
            let call = part.function_call.as_ref()?;
            Some(ToolCall::new(
                encode_tool_call_id(part.thought_signature.as_deref()),
                call.name.clone(),
                arguments_text(&call.args),
            ))
        })
        .collect();

    let usage = resp.usage_metadata.map(|u| Usage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    ChatResponse::assistant(model, text, tool_calls, usage)
}

// -- Stream conversion --

/// Translates `streamGenerateContent` events
///
/// Each function call arrives whole in a single event, so it is announced
/// and given its complete arguments at once. Calls carry no vendor id and
/// are keyed by arrival order across the whole stream.
#[derive(Debug, Default)]
pub struct GoogleTranslator {
    calls_seen: u32,
}

impl GoogleTranslator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamTranslator for GoogleTranslator {
    fn translate(&mut self, data: &str) -> Result<Vec<StreamEvent>, LlmError> {
        let chunk: GoogleResponse = serde_json::from_str(data).map_err(|e| decode_error(ProviderKind::Google, &e))?;

        if let Some(error) = chunk.error {
            return Err(LlmError::Upstream {
                provider: ProviderKind::Google,
                status: error.code,
                message: error.message,
            });
        }

        let mut events = Vec::new();
        let parts = chunk.candidates.first().map(GoogleCandidate::parts).unwrap_or_default();

        for part in parts {
            if let Some(text) = part.answer_text() {
                events.push(StreamEvent::Text(text.to_owned()));
            }

            if let Some(call) = &part.function_call {
                let key = format!("call-{}", self.calls_seen);
                self.calls_seen += 1;

                events.push(StreamEvent::ToolCallStart {
                    key: key.clone(),
                    id: encode_tool_call_id(part.thought_signature.as_deref()),
                    name: call.name.clone(),
                });
                events.push(StreamEvent::ToolCallArgs {
                    key,
                    arguments: arguments_text(&call.args),
                });
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::FinishReason;

    fn request(messages: serde_json::Value) -> ChatRequest {
        serde_json::from_value(json!({"model": "gemini-2.5-pro", "messages": messages})).unwrap()
    }

    #[test]
    fn system_is_hoisted_and_roles_mapped() {
        let req = request(json!([
            {"role": "system", "content": "be brief"},
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "hello"}
        ]));

        let wire = GoogleRequest::from(&req);
        let system = wire.system_instruction.unwrap();
        assert_eq!(system.parts[0].text.as_deref(), Some("be brief"));
        assert_eq!(wire.contents.len(), 2);
        assert_eq!(wire.contents[1].role.as_deref(), Some("model"));
        assert!(wire.generation_config.is_none());
        assert!(wire.tools.is_none());
    }

    #[test]
    fn signature_and_function_name_round_trip() {
        let id = encode_tool_call_id(Some("sig-bytes=="));
        let req = request(json!([
            {"role": "user", "content": "weather?"},
            {"role": "assistant", "content": null, "tool_calls": [
                {"id": id, "type": "function", "function": {"name": "weather", "arguments": "{\"city\":\"Paris\"}"}}
            ]},
            {"role": "tool", "tool_call_id": id, "content": "sunny"},
            {"role": "tool", "tool_call_id": "call_unknown00000", "content": "?"}
        ]));

        let wire = GoogleRequest::from(&req);
        assert_eq!(wire.contents.len(), 3);

        let call = &wire.contents[1].parts[0];
        assert_eq!(call.thought_signature.as_deref(), Some("sig-bytes=="));
        assert_eq!(call.function_call.as_ref().unwrap().args, json!({"city": "Paris"}));

        let responses = &wire.contents[2].parts;
        assert_eq!(responses.len(), 2);
        let first = responses[0].function_response.as_ref().unwrap();
        assert_eq!(first.name, "weather");
        assert_eq!(first.response, json!({"content": "sunny"}));
        assert_eq!(responses[1].function_response.as_ref().unwrap().name, "unknown");
    }

    #[test]
    fn plain_call_ids_carry_no_signature() {
        let req = request(json!([
            {"role": "assistant", "content": null, "tool_calls": [
                {"id": "call_abc", "type": "function", "function": {"name": "f", "arguments": "{}"}}
            ]}
        ]));

        let wire = GoogleRequest::from(&req);
        assert!(wire.contents[0].parts[0].thought_signature.is_none());
    }

    #[test]
    fn tools_choice_and_grounding() {
        let mut req = request(json!([{"role": "user", "content": "hi"}]));
        req.tools = Some(
            serde_json::from_value(json!([
                {"type": "function", "function": {"name": "lookup", "parameters": {"type": "object"}}}
            ]))
            .unwrap(),
        );
        req.tool_choice = Some(ToolChoice::Mode(ToolChoiceMode::Required));
        req.max_tokens = Some(256);

        let wire = GoogleRequest::from(&req).with_search_grounding();
        let value = serde_json::to_value(&wire).unwrap();

        assert_eq!(value["tools"][0]["functionDeclarations"][0]["name"], "lookup");
        assert_eq!(value["tools"][1], json!({"googleSearch": {}}));
        assert_eq!(value["toolConfig"]["functionCallingConfig"]["mode"], "ANY");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 256);
    }

    #[test]
    fn grounding_without_tools() {
        let req = request(json!([{"role": "user", "content": "news?"}]));
        let wire = GoogleRequest::from(&req).with_search_grounding();
        assert_eq!(serde_json::to_value(&wire).unwrap()["tools"], json!([{"googleSearch": {}}]));
    }

    #[test]
    fn reply_with_function_call() {
        let resp: GoogleResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "thinking about it", "thought": true},
                    {"functionCall": {"name": "weather", "args": {"city": "Paris"}}, "thoughtSignature": "c2ln"}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 7, "candidatesTokenCount": 3, "totalTokenCount": 12}
        }))
        .unwrap();

        let out = chat_response(resp, "gemini-2.5-pro");
        assert_eq!(out.finish_reason(), Some(FinishReason::ToolCalls));
        assert_eq!(out.choices[0].message.content, None);

        let call = &out.choices[0].message.tool_calls.as_ref().unwrap()[0];
        assert_eq!(decode_thought_signature(&call.id).as_deref(), Some("c2ln"));
        assert_eq!(call.function.arguments, r#"{"city":"Paris"}"#);
        assert_eq!(out.usage.unwrap().total_tokens, 12);
    }

    #[test]
    fn text_reply_skips_thoughts() {
        let resp: GoogleResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [
                {"text": "plan", "thought": true},
                {"text": "Hello"},
                {"text": " world"}
            ]}}]
        }))
        .unwrap();

        let out = chat_response(resp, "gemini-2.5-pro");
        assert_eq!(out.finish_reason(), Some(FinishReason::Stop));
        assert_eq!(out.choices[0].message.content.as_deref(), Some("Hello world"));
    }

    #[test]
    fn blocked_reply_is_empty_text() {
        let resp: GoogleResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();

        let out = chat_response(resp, "gemini-2.5-pro");
        assert_eq!(out.choices[0].message.content.as_deref(), Some(""));
    }

    #[test]
    fn stream_indexes_calls_across_chunks() {
        let mut t = GoogleTranslator::new();

        let first = t
            .translate(&json!({"candidates": [{"content": {"parts": [{"text": "Sure"}]}}]}).to_string())
            .unwrap();
        assert_eq!(first, [StreamEvent::Text("Sure".to_owned())]);

        let second = t
            .translate(
                &json!({"candidates": [{"content": {"parts": [
                    {"functionCall": {"name": "a", "args": {}}, "thoughtSignature": "s1"}
                ]}}]})
                .to_string(),
            )
            .unwrap();
        let third = t
            .translate(
                &json!({"candidates": [{"content": {"parts": [
                    {"functionCall": {"name": "b"}}
                ]}}]})
                .to_string(),
            )
            .unwrap();

        assert!(matches!(&second[0], StreamEvent::ToolCallStart { key, id, .. } if key == "call-0" && id.starts_with("tsig:")));
        assert_eq!(
            second[1],
            StreamEvent::ToolCallArgs {
                key: "call-0".to_owned(),
                arguments: "{}".to_owned(),
            }
        );
        assert!(matches!(&third[0], StreamEvent::ToolCallStart { key, id, name } if key == "call-1" && id.starts_with("call_") && name == "b"));
        assert!(matches!(&third[1], StreamEvent::ToolCallArgs { arguments, .. } if arguments == "{}"));
    }

    #[test]
    fn stream_error_payload_fails() {
        let mut t = GoogleTranslator::new();
        let err = t
            .translate(r#"{"error": {"code": 429, "message": "Resource exhausted", "status": "RESOURCE_EXHAUSTED"}}"#)
            .unwrap_err();
        assert!(matches!(err, LlmError::Upstream { status: 429, .. }));
    }
}
