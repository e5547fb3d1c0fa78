//! Streaming replies: passthrough and translation into canonical frames

mod harness;

use harness::config::{RoutesBuilder, candidate};
use harness::mock_vendor::{MockVendor, Reply};
use harness::server::{TestServer, sse_payloads};
use serde_json::{Value, json};

fn stream_request(model: &str) -> Value {
    json!({
        "model": model,
        "messages": [{"role": "user", "content": "hi"}],
        "stream": true
    })
}

async fn single_route(provider: &str, model: &str, vendor: &MockVendor, prefix: &str) -> TestServer {
    let (table, secrets) = RoutesBuilder::new()
        .route("chat", [candidate(provider, model, &vendor.base_url(prefix), &["KEY"])])
        .secret("KEY", "sk-stream-0001")
        .build();
    TestServer::start(table, secrets).await.unwrap()
}

/// Decode all JSON frames, asserting the sentinel comes last
fn frames(text: &str) -> Vec<Value> {
    let payloads = sse_payloads(text);
    assert_eq!(payloads.last().map(String::as_str), Some("[DONE]"), "stream must end with [DONE]: {text}");
    assert_eq!(payloads.iter().filter(|p| *p == "[DONE]").count(), 1);

    payloads[..payloads.len() - 1]
        .iter()
        .map(|p| serde_json::from_str(p).unwrap())
        .collect()
}

fn text_of(frames: &[Value]) -> String {
    frames
        .iter()
        .filter_map(|f| f["choices"][0]["delta"]["content"].as_str())
        .collect()
}

fn finish_reasons(frames: &[Value]) -> Vec<String> {
    frames
        .iter()
        .filter_map(|f| f["choices"][0]["finish_reason"].as_str())
        .map(str::to_owned)
        .collect()
}

#[tokio::test]
async fn openai_stream_is_forwarded() {
    let chunk = |delta: Value, finish: Value| {
        json!({
            "id": "chatcmpl-upstream",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": "gpt-4o",
            "choices": [{"index": 0, "delta": delta, "finish_reason": finish}]
        })
        .to_string()
    };
    let vendor = MockVendor::start(Reply::sse([
        chunk(json!({"role": "assistant", "content": ""}), Value::Null),
        chunk(json!({"content": "Hel"}), Value::Null),
        chunk(json!({"content": "lo"}), Value::Null),
        chunk(json!({}), json!("stop")),
        "[DONE]".to_owned(),
    ]))
    .await
    .unwrap();
    let server = single_route("openai", "gpt-4o", &vendor, "/v1").await;

    let resp = server.chat(&stream_request("chat")).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "text/event-stream");
    assert_eq!(resp.headers()["cache-control"], "no-cache");

    let frames = frames(&resp.text().await.unwrap());
    assert_eq!(frames.len(), 4);
    assert!(frames.iter().all(|f| f["id"] == "chatcmpl-upstream"));
    assert_eq!(text_of(&frames), "Hello");
    assert_eq!(finish_reasons(&frames), ["stop"]);

    assert_eq!(vendor.requests()[0].body["stream"], true);
}

#[tokio::test]
async fn anthropic_stream_is_translated() {
    let vendor = MockVendor::start(Reply::sse([
        json!({"type": "message_start", "message": {"id": "msg_01", "model": "claude-sonnet-4"}}).to_string(),
        json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}).to_string(),
        json!({"type": "ping"}).to_string(),
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Let me "}}).to_string(),
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "check."}}).to_string(),
        json!({"type": "content_block_stop", "index": 0}).to_string(),
        json!({"type": "content_block_start", "index": 1, "content_block": {"type": "tool_use", "id": "toolu_01", "name": "get_weather"}}).to_string(),
        json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": "{\"city\":"}}).to_string(),
        json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": "\"Paris\"}"}}).to_string(),
        json!({"type": "content_block_stop", "index": 1}).to_string(),
        json!({"type": "message_delta", "delta": {"stop_reason": "tool_use"}}).to_string(),
        json!({"type": "message_stop"}).to_string(),
    ]))
    .await
    .unwrap();
    let server = single_route("anthropic", "claude-sonnet-4", &vendor, "/v1").await;

    let resp = server.chat(&stream_request("chat")).await;
    assert_eq!(resp.status(), 200);

    let frames = frames(&resp.text().await.unwrap());

    // One completion identity across the whole stream
    let id = frames[0]["id"].as_str().unwrap().to_owned();
    assert!(id.starts_with("chatcmpl-"));
    assert!(frames.iter().all(|f| f["id"] == id.as_str()));
    assert!(frames.iter().all(|f| f["model"] == "claude-sonnet-4"));
    assert!(frames.iter().all(|f| f["object"] == "chat.completion.chunk"));

    assert_eq!(frames[0]["choices"][0]["delta"]["role"], "assistant");
    assert_eq!(text_of(&frames), "Let me check.");

    let calls: Vec<&Value> = frames
        .iter()
        .filter_map(|f| f["choices"][0]["delta"]["tool_calls"].get(0))
        .collect();
    assert_eq!(calls[0]["index"], 0);
    assert_eq!(calls[0]["id"], "toolu_01");
    assert_eq!(calls[0]["function"]["name"], "get_weather");
    let arguments: String = calls
        .iter()
        .filter_map(|c| c["function"]["arguments"].as_str())
        .collect();
    assert_eq!(arguments, r#"{"city":"Paris"}"#);

    assert_eq!(finish_reasons(&frames), ["tool_calls"]);
    assert_eq!(vendor.requests()[0].body["stream"], true);
}

#[tokio::test]
async fn google_stream_ends_without_sentinel() {
    let vendor = MockVendor::start(Reply::sse([
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "pondering", "thought": true}]}}]}).to_string(),
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "Bonjour"}]}}]}).to_string(),
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": " Paris"}]}, "finishReason": "STOP"}]}).to_string(),
    ]))
    .await
    .unwrap();
    let server = single_route("google", "gemini-2.5-pro", &vendor, "/v1beta").await;

    let resp = server.chat(&stream_request("chat")).await;
    assert_eq!(resp.status(), 200);

    let frames = frames(&resp.text().await.unwrap());
    assert_eq!(text_of(&frames), "Bonjour Paris");
    assert_eq!(finish_reasons(&frames), ["stop"]);

    let request = &vendor.requests()[0];
    assert_eq!(request.path, "/v1beta/models/gemini-2.5-pro:streamGenerateContent");
    assert_eq!(request.query.as_deref(), Some("alt=sse"));
}

#[tokio::test]
async fn google_streamed_calls_get_distinct_indices() {
    let call = |city: &str, signature: &str| {
        json!({"candidates": [{"content": {"role": "model", "parts": [
            {"functionCall": {"name": "get_weather", "args": {"city": city}}, "thoughtSignature": signature}
        ]}}]})
        .to_string()
    };
    let vendor = MockVendor::start(Reply::sse([call("Paris", "sig-a"), call("Rome", "sig-b")]))
        .await
        .unwrap();
    let server = single_route("google", "gemini-2.5-pro", &vendor, "/v1beta").await;

    let frames = frames(&server.chat(&stream_request("chat")).await.text().await.unwrap());

    let starts: Vec<&Value> = frames
        .iter()
        .filter_map(|f| f["choices"][0]["delta"]["tool_calls"].get(0))
        .filter(|c| c.get("id").is_some_and(Value::is_string))
        .collect();
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[0]["index"], 0);
    assert_eq!(starts[1]["index"], 1);
    assert!(starts[0]["id"].as_str().unwrap().starts_with("tsig:"));
    assert_ne!(starts[0]["id"], starts[1]["id"]);
    assert_eq!(finish_reasons(&frames), ["tool_calls"]);
}

#[tokio::test]
async fn workers_ai_stream_is_translated() {
    let vendor = MockVendor::start(Reply::sse([
        json!({"response": "Hi"}).to_string(),
        json!({"response": " there"}).to_string(),
        "[DONE]".to_owned(),
    ]))
    .await
    .unwrap();
    let server = single_route("cloudflare-ai", "@cf/meta/llama-3.1-8b-instruct", &vendor, "/ai/run").await;

    let frames = frames(&server.chat(&stream_request("chat")).await.text().await.unwrap());
    assert_eq!(text_of(&frames), "Hi there");
    assert_eq!(finish_reasons(&frames), ["stop"]);
    assert!(frames.iter().all(|f| f["model"] == "@cf/meta/llama-3.1-8b-instruct"));
}

#[tokio::test]
async fn mid_stream_error_terminates_cleanly() {
    let vendor = MockVendor::start(Reply::sse([
        json!({"type": "message_start", "message": {"id": "msg_01", "model": "claude-sonnet-4"}}).to_string(),
        json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}).to_string(),
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "partial"}}).to_string(),
        json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}).to_string(),
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": " never sent"}}).to_string(),
    ]))
    .await
    .unwrap();
    let server = single_route("anthropic", "claude-sonnet-4", &vendor, "/v1").await;

    let resp = server.chat(&stream_request("chat")).await;
    assert_eq!(resp.status(), 200);

    let frames = frames(&resp.text().await.unwrap());
    assert_eq!(text_of(&frames), "partial");
    assert_eq!(finish_reasons(&frames), ["stop"]);
    assert!(frames.iter().all(|f| f.get("error").is_none()));
}

#[tokio::test]
async fn rejected_stream_falls_back_before_any_bytes() {
    let primary = MockVendor::start(Reply::error(503, &json!({"error": {"message": "busy"}})))
        .await
        .unwrap();
    let backup = MockVendor::start(Reply::sse([json!({"response": "from backup"}).to_string(), "[DONE]".to_owned()]))
        .await
        .unwrap();

    let (table, secrets) = RoutesBuilder::new()
        .route(
            "chat",
            [
                candidate("openai", "gpt-4o", &primary.base_url("/v1"), &["KEY"]),
                candidate("cloudflare-ai", "@cf/meta/llama-3.1-8b-instruct", &backup.base_url("/ai/run"), &[]),
            ],
        )
        .secret("KEY", "sk-stream-0001")
        .build();
    let server = TestServer::start(table, secrets).await.unwrap();

    let frames = frames(&server.chat(&stream_request("chat")).await.text().await.unwrap());
    assert_eq!(text_of(&frames), "from backup");
    assert_eq!(primary.request_count(), 1);
}
