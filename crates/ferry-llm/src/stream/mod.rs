//! Streaming: canonical frame encoding and the producer/consumer pipeline

mod pipe;
pub mod session;
pub mod signature;
pub mod writer;

use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

use crate::error::LlmError;

pub use pipe::{CHANNEL_CAPACITY, spawn_translation};
pub use session::StreamSession;
pub use signature::{decode_thought_signature, encode_tool_call_id};
pub use writer::{ConsumerClosed, StreamWriter};

/// Live sequence of wire-framed bytes (`data: <json>\n\n` ... `data: [DONE]\n\n`)
pub type ChatStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// Vendor-neutral event produced by a [`StreamTranslator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Text fragment
    Text(String),
    /// A new tool call, keyed by a vendor-side identifier
    ToolCallStart { key: String, id: String, name: String },
    /// Argument fragment for a previously announced tool call
    ToolCallArgs { key: String, arguments: String },
    /// Already canonical frame, forwarded verbatim
    Raw {
        frame: Bytes,
        /// Identity of the upstream chunk, reused for frames the writer adds
        identity: Option<ChunkIdentity>,
        /// The chunk streams a tool call delta
        tool_calls: bool,
        /// The chunk carries a finish reason
        finished: bool,
    },
    /// Vendor signalled the end of the reply
    Done,
}

/// Completion id, timestamp and model of a forwarded chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkIdentity {
    pub id: String,
    pub created: u64,
    pub model: Option<String>,
}

/// Translates one vendor's SSE payloads into [`StreamEvent`]s
pub trait StreamTranslator: Send + 'static {
    /// Translate the `data` field of one vendor SSE event
    ///
    /// # Errors
    ///
    /// Returns an error when the vendor reports a failure mid-stream or the
    /// payload cannot be decoded; the stream is then terminated with a
    /// `stop` finish
    fn translate(&mut self, data: &str) -> Result<Vec<StreamEvent>, LlmError>;
}
