use std::collections::HashMap;

use secrecy::SecretString;

/// Resolves credential reference names to secret values
pub trait SecretStore: Send + Sync {
    /// Look up a secret by reference name
    ///
    /// Returns `None` when the reference is unknown or empty.
    fn resolve(&self, name: &str) -> Option<SecretString>;
}

/// Secret store backed by process environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn resolve(&self, name: &str) -> Option<SecretString> {
        std::env::var(name)
            .ok()
            .filter(|value| !value.is_empty())
            .map(SecretString::from)
    }
}

/// In-memory secret store
#[derive(Debug, Clone, Default)]
pub struct MapSecretStore {
    secrets: HashMap<String, SecretString>,
}

impl MapSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a secret
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), SecretString::from(value.into()));
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapSecretStore {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        iter.into_iter().fold(Self::new(), |store, (k, v)| store.with(k, v))
    }
}

impl SecretStore for MapSecretStore {
    fn resolve(&self, name: &str) -> Option<SecretString> {
        use secrecy::ExposeSecret;

        self.secrets
            .get(name)
            .filter(|value| !value.expose_secret().is_empty())
            .cloned()
    }
}
