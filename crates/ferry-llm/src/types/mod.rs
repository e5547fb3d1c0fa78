//! Canonical chat completion types
//!
//! These follow the `OpenAI` chat completion wire format and serve as the
//! normalized representation that every vendor format converts to and from.

pub mod message;
pub mod request;
pub mod response;
pub mod stream;
pub mod tool;

pub use message::{Content, ContentPart, FunctionCall, ImageUrl, Message, Role, ToolCall};
pub use request::{ChatRequest, StopSequences};
pub use response::{ChatResponse, Choice, ChoiceMessage, FinishReason, Usage};
pub use stream::{FunctionCallDelta, StreamChoice, StreamChunk, StreamDelta, ToolCallDelta};
pub use tool::{FunctionDefinition, ToolChoice, ToolChoiceFunction, ToolChoiceFunctionName, ToolChoiceMode, ToolDefinition};
