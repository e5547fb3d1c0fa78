//! Configuration for the Ferry gateway
//!
//! Holds the routing table (logical model name to ordered fallback chain),
//! the secret store used to resolve credential references, and the
//! listener settings of the HTTP boundary.

#![allow(clippy::must_use_candidate)]

mod error;
mod loader;
pub mod routes;
pub mod secrets;
pub mod server;

pub use error::ConfigError;
pub use routes::{ProviderConfig, ProviderKind, RoutingTable};
pub use secrets::{EnvSecretStore, MapSecretStore, SecretStore};
pub use server::ServerConfig;
