//! Thought signatures carried inside tool call ids
//!
//! Some vendors hand out an opaque signature with every function call and
//! require it back on the next turn. The canonical format has no field for
//! it, so it travels in the tool call id:
//!
//! ```text
//! tsig:<base64url signature, unpadded>:<random suffix>
//! ```
//!
//! Ids without a signature look like `call_<random suffix>`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::id::random_alphanumeric;

const SIGNATURE_PREFIX: &str = "tsig:";
const PLAIN_PREFIX: &str = "call_";
const SUFFIX_LEN: usize = 12;

/// Build a tool call id, embedding `signature` when one is present
pub fn encode_tool_call_id(signature: Option<&str>) -> String {
    let suffix = random_alphanumeric(SUFFIX_LEN);

    match signature.filter(|s| !s.is_empty()) {
        Some(signature) => {
            let encoded = URL_SAFE_NO_PAD.encode(signature.as_bytes());
            format!("{SIGNATURE_PREFIX}{encoded}:{suffix}")
        }
        None => format!("{PLAIN_PREFIX}{suffix}"),
    }
}

/// Recover the signature embedded in a tool call id
///
/// Returns `None` for ids without the signature tag and for tagged ids
/// whose payload does not decode.
pub fn decode_thought_signature(tool_call_id: &str) -> Option<String> {
    let rest = tool_call_id.strip_prefix(SIGNATURE_PREFIX)?;
    let (encoded, _suffix) = rest.rsplit_once(':')?;
    let bytes = URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')).ok()?;
    String::from_utf8(bytes).ok()
}
