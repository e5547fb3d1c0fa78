//! Routing table and secret fixtures

use ferry_config::{MapSecretStore, RoutingTable};
use serde_json::{Map, Value, json};

/// Builder for a routing table plus the secrets it references
#[derive(Default)]
pub struct RoutesBuilder {
    routes: Map<String, Value>,
    secrets: MapSecretStore,
}

impl RoutesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a logical model with its ordered candidates
    pub fn route(mut self, model: &str, candidates: impl IntoIterator<Item = Value>) -> Self {
        self.routes
            .insert(model.to_owned(), Value::Array(candidates.into_iter().collect()));
        self
    }

    /// Make a credential reference resolvable
    pub fn secret(mut self, name: &str, value: &str) -> Self {
        self.secrets = self.secrets.with(name, value);
        self
    }

    pub fn build(self) -> (RoutingTable, MapSecretStore) {
        let raw = Value::Object(self.routes).to_string();
        (RoutingTable::from_json(&raw).unwrap(), self.secrets)
    }
}

/// Candidate entry pointing at a mock vendor
pub fn candidate(provider: &str, model: &str, base_url: &str, api_keys: &[&str]) -> Value {
    json!({
        "provider": provider,
        "model": model,
        "baseUrl": base_url,
        "apiKeys": api_keys,
    })
}
