//! Translation between the canonical types and vendor wire formats
//!
//! Each submodule converts requests outbound, whole replies inbound and
//! provides a [`StreamTranslator`](crate::stream::StreamTranslator) for the
//! vendor's SSE events.

pub mod anthropic;
pub mod google;
pub mod openai;
pub mod workers_ai;

use ferry_config::ProviderKind;

use crate::error::LlmError;

/// Wrap a serde failure on a vendor payload
pub(crate) fn decode_error(provider: ProviderKind, err: &serde_json::Error) -> LlmError {
    LlmError::Decode {
        provider,
        message: err.to_string(),
    }
}

/// Serialize tool input back to argument text, `{}` when it cannot be rendered
pub(crate) fn arguments_text(input: &serde_json::Value) -> String {
    if input.is_null() {
        return "{}".to_owned();
    }
    serde_json::to_string(input).unwrap_or_else(|_| "{}".to_owned())
}
