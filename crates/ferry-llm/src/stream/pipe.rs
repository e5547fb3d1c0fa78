use eventsource_stream::Eventsource;
use ferry_config::ProviderKind;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;

use super::{ChatStream, StreamTranslator, StreamWriter, session::StreamSession};

/// Frames buffered between the producer task and the consumer
pub const CHANNEL_CAPACITY: usize = 32;

/// Spawn a producer translating a vendor SSE byte stream into canonical frames
///
/// The returned stream is the reading end of a bounded channel. The producer
/// stops as soon as the reader is dropped, and on every exit path drops its
/// sender so the reader always sees the end of the stream. Upstream and
/// translation failures terminate the stream with a `stop` finish frame and
/// the `[DONE]` sentinel.
pub fn spawn_translation<S, B, E, T>(
    upstream: S,
    translator: T,
    session: StreamSession,
    provider: ProviderKind,
) -> ChatStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
    T: StreamTranslator,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let writer = StreamWriter::new(session, tx);

    tokio::spawn(produce(upstream, translator, writer, provider));

    Box::pin(futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|frame| (frame, rx))
    }))
}

async fn produce<S, B, E, T>(upstream: S, mut translator: T, mut writer: StreamWriter, provider: ProviderKind)
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
    T: StreamTranslator,
{
    let mut events = std::pin::pin!(upstream.eventsource());

    loop {
        let next = tokio::select! {
            () = writer.closed() => None,
            next = events.next() => Some(next),
        };

        let Some(next) = next else {
            tracing::debug!(%provider, id = %writer.session().id(), "client disconnected, stopping stream");
            return;
        };

        match next {
            None => break,
            Some(Ok(event)) => {
                let data = event.data.trim();
                if data.is_empty() {
                    continue;
                }

                let translated = match translator.translate(data) {
                    Ok(translated) => translated,
                    Err(e) => {
                        tracing::warn!(%provider, error = %e, "stream aborted");
                        writer.abort().await;
                        return;
                    }
                };

                for event in translated {
                    if writer.apply(event).await.is_err() {
                        tracing::debug!(%provider, id = %writer.session().id(), "client disconnected, stopping stream");
                        return;
                    }
                }

                if writer.is_done() {
                    return;
                }
            }
            Some(Err(e)) => {
                tracing::warn!(%provider, error = %e, "upstream stream failed");
                writer.abort().await;
                return;
            }
        }
    }

    if writer.complete().await.is_err() {
        tracing::debug!(%provider, "client disconnected before stream end");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use tokio::sync::oneshot;

    use super::*;
    use crate::convert::openai::OpenAiTranslator;
    use crate::error::LlmError;
    use crate::stream::StreamEvent;

    /// Echoes payloads as text; `fail` aborts, `end` finishes
    struct Echo {
        _dropped: Option<oneshot::Sender<()>>,
    }

    impl StreamTranslator for Echo {
        fn translate(&mut self, data: &str) -> Result<Vec<StreamEvent>, LlmError> {
            match data {
                "fail" => Err(LlmError::Decode {
                    provider: ProviderKind::Openai,
                    message: "bad payload".to_owned(),
                }),
                "end" => Ok(vec![StreamEvent::Done]),
                text => Ok(vec![StreamEvent::Text(text.to_owned())]),
            }
        }
    }

    fn echo() -> Echo {
        Echo { _dropped: None }
    }

    fn sse(lines: &[&str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
        let chunks: Vec<_> = lines
            .iter()
            .map(|line| Ok(Bytes::from(format!("data: {line}\n\n"))))
            .collect();
        futures_util::stream::iter(chunks)
    }

    async fn collect(stream: ChatStream) -> Vec<String> {
        stream
            .map(|frame| String::from_utf8(frame.to_vec()).unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn upstream_end_completes_stream() {
        let stream = spawn_translation(sse(&["a", "b"]), echo(), StreamSession::new("m"), ProviderKind::Openai);
        let frames = collect(stream).await;

        assert_eq!(frames.len(), 5);
        assert!(frames[0].contains(r#""role":"assistant""#));
        assert!(frames[1].contains(r#""content":"a""#));
        assert!(frames[3].contains(r#""finish_reason":"stop""#));
        assert_eq!(frames[4], "data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn done_event_ignores_trailing_payloads() {
        let stream = spawn_translation(
            sse(&["a", "end", "after"]),
            echo(),
            StreamSession::new("m"),
            ProviderKind::Openai,
        );
        let frames = collect(stream).await;

        assert_eq!(frames.last().unwrap(), "data: [DONE]\n\n");
        assert!(!frames.iter().any(|f| f.contains("after")));
    }

    #[tokio::test]
    async fn translation_failure_terminates_cleanly() {
        let stream = spawn_translation(
            sse(&["a", "fail", "b"]),
            echo(),
            StreamSession::new("m"),
            ProviderKind::Openai,
        );
        let frames = collect(stream).await;

        assert_eq!(frames.len(), 4);
        assert!(frames[2].contains(r#""finish_reason":"stop""#));
        assert_eq!(frames[3], "data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn forwarded_tool_call_stream_keeps_one_identity() {
        let chunk = r#"{"id":"up","object":"chat.completion.chunk","created":1,"model":"gpt-4o","choices":[{"index":0,"delta":{"role":"assistant","tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"f","arguments":"{}"}}]},"finish_reason":null}]}"#;
        let stream = spawn_translation(
            sse(&[chunk, "[DONE]"]),
            OpenAiTranslator::new(ProviderKind::Openai),
            StreamSession::new("gpt-4o"),
            ProviderKind::Openai,
        );
        let frames = collect(stream).await;

        assert_eq!(frames.len(), 3);
        let finish: serde_json::Value =
            serde_json::from_str(frames[1].strip_prefix("data: ").unwrap().trim_end()).unwrap();
        assert_eq!(finish["id"], "up");
        assert_eq!(finish["created"], 1);
        assert_eq!(finish["choices"][0]["finish_reason"], "tool_calls");
        assert_eq!(frames[2], "data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn forwarded_stream_abort_keeps_upstream_identity() {
        let upstream = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(
                b"data: {\"id\":\"up\",\"created\":1,\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hi\"},\"finish_reason\":null}]}\n\n",
            )),
            Err(std::io::Error::other("connection reset")),
        ]);
        let stream = spawn_translation(
            upstream,
            OpenAiTranslator::new(ProviderKind::OpenaiCompatible),
            StreamSession::new("llama"),
            ProviderKind::OpenaiCompatible,
        );
        let frames = collect(stream).await;

        assert_eq!(frames.len(), 3);
        assert!(frames[1].contains(r#""id":"up""#));
        assert!(frames[1].contains(r#""created":1,"#));
        assert!(frames[1].contains(r#""model":"llama""#));
        assert!(frames[1].contains(r#""finish_reason":"stop""#));
    }

    #[tokio::test]
    async fn upstream_error_terminates_cleanly() {
        let upstream = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"data: a\n\n")),
            Err(std::io::Error::other("connection reset")),
        ]);
        let frames = collect(spawn_translation(upstream, echo(), StreamSession::new("m"), ProviderKind::Openai)).await;

        assert!(frames[frames.len() - 2].contains(r#""finish_reason":"stop""#));
        assert_eq!(frames.last().unwrap(), "data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn empty_upstream_still_terminates() {
        let upstream = futures_util::stream::iter(Vec::<Result<Bytes, std::io::Error>>::new());
        let frames = collect(spawn_translation(upstream, echo(), StreamSession::new("m"), ProviderKind::Openai)).await;

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2], "data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn dropped_consumer_stops_producer() {
        let (dropped_tx, dropped_rx) = oneshot::channel();
        let translator = Echo {
            _dropped: Some(dropped_tx),
        };

        let upstream = futures_util::stream::pending::<Result<Bytes, std::io::Error>>();
        let stream = spawn_translation(upstream, translator, StreamSession::new("m"), ProviderKind::Openai);
        drop(stream);

        let outcome = tokio::time::timeout(Duration::from_secs(2), dropped_rx).await;
        assert!(matches!(outcome, Ok(Err(_))), "producer should exit once the consumer is gone");
    }
}
