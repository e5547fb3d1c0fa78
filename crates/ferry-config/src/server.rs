use std::net::SocketAddr;

use secrecy::SecretString;

/// Default listen address of the HTTP boundary
pub const DEFAULT_LISTEN_ADDRESS: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED),
    8787,
);

/// HTTP boundary settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub listen_address: SocketAddr,
    /// Shared bearer token required on chat endpoints; `None` disables the check
    pub auth_token: Option<SecretString>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS,
            auth_token: None,
        }
    }
}
