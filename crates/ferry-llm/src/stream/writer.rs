use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use super::StreamEvent;
use super::session::StreamSession;
use crate::types::FinishReason;

/// The reading end of the stream is gone
#[derive(Debug, Clone, Copy, Error)]
#[error("stream consumer closed")]
pub struct ConsumerClosed;

/// Writes canonical frames for one session into a bounded channel
///
/// Guarantees a single role frame ahead of any content and nothing after
/// the `[DONE]` sentinel.
pub struct StreamWriter {
    session: StreamSession,
    tx: mpsc::Sender<Bytes>,
    role_sent: bool,
    finish_sent: bool,
    done: bool,
    finish_reason: Option<FinishReason>,
    identity_adopted: bool,
    forwarded_tool_calls: bool,
}

impl StreamWriter {
    pub const fn new(session: StreamSession, tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            session,
            tx,
            role_sent: false,
            finish_sent: false,
            done: false,
            finish_reason: None,
            identity_adopted: false,
            forwarded_tool_calls: false,
        }
    }

    pub const fn session(&self) -> &StreamSession {
        &self.session
    }

    /// Whether the `[DONE]` sentinel has been written
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// Resolves once the consumer has dropped the reading end
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    /// Render one translated vendor event
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerClosed`] when the reader is gone
    pub async fn apply(&mut self, event: StreamEvent) -> Result<(), ConsumerClosed> {
        if self.done {
            return Ok(());
        }

        match event {
            StreamEvent::Text(text) => {
                if text.is_empty() {
                    return Ok(());
                }
                self.ensure_role().await?;
                let frame = self.session.text_chunk(&text);
                self.send(frame).await
            }
            StreamEvent::ToolCallStart { key, id, name } => {
                self.ensure_role().await?;
                let index = self.session.tool_call_index(&key);
                let frame = self.session.tool_call_start_chunk(index, &id, &name);
                self.send(frame).await
            }
            StreamEvent::ToolCallArgs { key, arguments } => {
                if arguments.is_empty() {
                    return Ok(());
                }
                self.ensure_role().await?;
                let index = self.session.tool_call_index(&key);
                let frame = self.session.tool_call_args_chunk(index, &arguments);
                self.send(frame).await
            }
            StreamEvent::Raw {
                frame,
                identity,
                tool_calls,
                finished,
            } => {
                if !self.identity_adopted
                    && let Some(identity) = identity
                {
                    self.session.adopt_identity(identity);
                    self.identity_adopted = true;
                }
                // forwarded frames carry their own role chunk
                self.role_sent = true;
                self.forwarded_tool_calls |= tool_calls;
                self.finish_sent |= finished;
                self.send(frame).await
            }
            StreamEvent::Done => self.complete().await,
        }
    }

    /// Close the stream normally
    ///
    /// Writes the finish frame unless one was already forwarded, then the
    /// sentinel. The finish is `tool_calls` when any tool call was streamed
    /// and `stop` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerClosed`] when the reader is gone
    pub async fn complete(&mut self) -> Result<(), ConsumerClosed> {
        if self.done {
            return Ok(());
        }

        self.ensure_role().await?;

        if !self.finish_sent {
            let saw_tool_calls = self.forwarded_tool_calls || self.session.tool_call_count() > 0;
            let reason = self.finish_reason.unwrap_or(if saw_tool_calls {
                FinishReason::ToolCalls
            } else {
                FinishReason::Stop
            });
            let frame = self.session.finish_chunk(reason);
            self.send(frame).await?;
            self.finish_sent = true;
        }

        let done = self.session.done();
        self.send(done).await?;
        self.done = true;
        Ok(())
    }

    /// Best-effort termination after a failure: `stop` finish, then sentinel
    pub async fn abort(&mut self) {
        if self.done {
            return;
        }
        self.finish_reason = Some(FinishReason::Stop);
        if self.complete().await.is_err() {
            tracing::debug!(id = %self.session.id(), "consumer gone before stream could be terminated");
        }
    }

    async fn ensure_role(&mut self) -> Result<(), ConsumerClosed> {
        if !self.role_sent {
            let frame = self.session.role_chunk();
            self.send(frame).await?;
            self.role_sent = true;
        }
        Ok(())
    }

    async fn send(&self, frame: Bytes) -> Result<(), ConsumerClosed> {
        self.tx.send(frame).await.map_err(|_| ConsumerClosed)
    }
}
