use thiserror::Error;

/// Errors raised while loading the routing configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No routing configuration was supplied
    #[error("routing configuration is missing")]
    Missing,

    /// The document is not valid JSON or does not match the expected shape
    #[error("routing configuration is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A logical model maps to an empty fallback chain
    #[error("model `{model}` has no provider candidates")]
    EmptyChain { model: String },

    /// The configuration file could not be read
    #[error("failed to read routing configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
