use indexmap::IndexMap;
use serde::Deserialize;
use url::Url;

use crate::ConfigError;

/// Vendor family served by a routing candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Anthropic Messages API
    Anthropic,
    /// Google Generative Language API
    Google,
    /// `OpenAI` Chat Completions API
    Openai,
    /// Any endpoint speaking the `OpenAI` chat completion protocol
    OpenaiCompatible,
    /// Cloudflare Workers AI
    CloudflareAi,
}

impl ProviderKind {
    /// Stable name used in logs and error messages
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Openai => "openai",
            Self::OpenaiCompatible => "openai-compatible",
            Self::CloudflareAi => "cloudflare-ai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate in a fallback chain
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProviderConfig {
    /// Vendor family
    pub provider: ProviderKind,
    /// Vendor-side model name
    pub model: String,
    /// Ordered credential reference names, resolved through a [`crate::SecretStore`]
    #[serde(default)]
    pub api_keys: Vec<String>,
    /// Base URL override for differently hosted endpoints
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Attach the Google Search grounding tool (Google only)
    #[serde(default)]
    pub grounding: bool,
    /// Reference name of the account id secret (Cloudflare only)
    #[serde(default)]
    pub account_id: Option<String>,
}

/// Logical model name to ordered fallback chain
///
/// Insertion order is preserved; the first entry doubles as the default
/// route for unknown model names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RoutingTable(IndexMap<String, Vec<ProviderConfig>>);

impl RoutingTable {
    /// Parse a routing table from its JSON representation
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a JSON object of candidate
    /// arrays, or if any model maps to an empty array
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let table: Self = serde_json::from_str(raw)?;

        if let Some((model, _)) = table.0.iter().find(|(_, chain)| chain.is_empty()) {
            return Err(ConfigError::EmptyChain { model: model.clone() });
        }

        Ok(table)
    }

    /// Fallback chain for an exact model name
    pub fn get(&self, model: &str) -> Option<&[ProviderConfig]> {
        self.0.get(model).map(Vec::as_slice)
    }

    /// First-inserted entry
    pub fn first(&self) -> Option<(&str, &[ProviderConfig])> {
        self.0.first().map(|(model, chain)| (model.as_str(), chain.as_slice()))
    }

    /// Logical model names in insertion order
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
