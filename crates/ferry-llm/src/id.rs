//! Identifier and timestamp helpers

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of the random part of a completion id
const COMPLETION_ID_LEN: usize = 29;

/// Random alphanumeric string of `len` characters
pub fn random_alphanumeric(len: usize) -> String {
    rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

/// Fresh `chatcmpl-` prefixed completion id
pub fn completion_id() -> String {
    format!("chatcmpl-{}", random_alphanumeric(COMPLETION_ID_LEN))
}

/// Current unix time in seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
