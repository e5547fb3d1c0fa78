use ferry_config::ProviderKind;
use http::StatusCode;
use thiserror::Error;

/// Errors that can occur while routing or executing a chat completion
#[derive(Debug, Error)]
pub enum LlmError {
    /// Client sent a malformed or incomplete request
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Request lacks valid gateway credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// The routing table has no entry to serve the model
    #[error("no route configured for model `{model}`")]
    NotConfigured { model: String },

    /// A routing candidate cannot be turned into a working adapter
    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),

    /// No credential resolved for a vendor that requires one
    #[error("no API key available for {provider}/{model}")]
    MissingCredentials { provider: ProviderKind, model: String },

    /// Vendor answered with a non-success status
    #[error("{provider} returned {status}: {message}")]
    Upstream {
        provider: ProviderKind,
        status: u16,
        message: String,
    },

    /// Request to the vendor could not be completed
    #[error("{provider} request failed: {message}")]
    Transport { provider: ProviderKind, message: String },

    /// Vendor reply could not be decoded
    #[error("{provider} returned an undecodable reply: {message}")]
    Decode { provider: ProviderKind, message: String },

    /// Every candidate of the fallback chain failed
    #[error("All providers failed. Last error: {}", last_message(.failures))]
    AllProvidersFailed {
        /// Failure of each attempted candidate, in order
        failures: Vec<CandidateFailure>,
    },
}

/// Failure of one routing candidate
#[derive(Debug)]
pub struct CandidateFailure {
    /// Vendor of the candidate
    pub provider: ProviderKind,
    /// Vendor-side model name
    pub model: String,
    /// Why the candidate failed
    pub error: LlmError,
}

impl LlmError {
    /// Whether trying the next credential may succeed
    ///
    /// Rate limiting (429) and gateway unavailability (502, 503) are
    /// transient, as are failures whose message reports a timeout, an
    /// overload or a rate limit. Everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { status, message, .. } => {
                matches!(status, 429 | 502 | 503) || indicates_transient(message)
            }
            Self::Transport { message, .. } => indicates_transient(message),
            _ => false,
        }
    }

    /// HTTP status reported to the client
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotConfigured { .. } => StatusCode::NOT_FOUND,
            Self::Upstream { status, .. } => StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Transport { .. } | Self::Decode { .. } => StatusCode::BAD_GATEWAY,
            Self::InvalidConfig(_) | Self::MissingCredentials { .. } | Self::AllProvidersFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Error type string of the JSON error body
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "invalid_request_error",
            Self::Unauthorized => "authentication_error",
            Self::NotConfigured { .. } => "not_found_error",
            Self::InvalidConfig(_) | Self::MissingCredentials { .. } => "configuration_error",
            Self::Upstream { .. } | Self::Transport { .. } | Self::Decode { .. } => "upstream_error",
            Self::AllProvidersFailed { .. } => "proxy_error",
        }
    }

    /// Machine-readable code of the JSON error body
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::Unauthorized => Some("invalid_auth"),
            Self::NotConfigured { .. } => Some("model_not_found"),
            Self::AllProvidersFailed { .. } => Some("all_providers_failed"),
            _ => None,
        }
    }

    /// Message safe to return to the client
    pub fn client_message(&self) -> String {
        self.to_string()
    }

    /// Error of the last attempted candidate of an exhausted chain
    pub fn last_error(&self) -> Option<&Self> {
        match self {
            Self::AllProvidersFailed { failures } => failures.last().map(|f| &f.error),
            _ => None,
        }
    }
}

fn last_message(failures: &[CandidateFailure]) -> String {
    failures
        .last()
        .map_or_else(|| "Unknown error".to_owned(), |f| f.error.to_string())
}

/// Whether an error message reports a transient vendor condition
fn indicates_transient(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["timeout", "timed out", "overloaded", "rate limit"]
        .iter()
        .any(|needle| message.contains(needle))
}
