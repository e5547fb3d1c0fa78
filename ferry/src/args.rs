use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use ferry_config::server::DEFAULT_LISTEN_ADDRESS;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Ferry LLM gateway
#[derive(Debug, Parser)]
#[command(name = "ferry", about = "OpenAI-compatible gateway with credential rotation and provider fallback")]
pub struct Args {
    /// Inline routing table (JSON); wins over --routes-file
    #[arg(long, env = "ROUTES_CONFIG", hide_env_values = true)]
    pub routes: Option<String>,

    /// Path to a routing table file (JSON)
    #[arg(long, env = "FERRY_ROUTES_FILE")]
    pub routes_file: Option<PathBuf>,

    /// Shared token required on chat endpoints
    #[arg(long, env = "PROXY_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Listen address
    #[arg(long, env = "FERRY_LISTEN", default_value_t = DEFAULT_LISTEN_ADDRESS)]
    pub listen: SocketAddr,

    /// Seconds to wait for a vendor connection to open
    #[arg(long, env = "FERRY_CONNECT_TIMEOUT", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: u64,

    /// Longest silence allowed from a vendor, in seconds; streams may run longer overall
    #[arg(long, env = "FERRY_READ_TIMEOUT", default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub read_timeout: u64,

    /// Log output format
    #[arg(long, env = "FERRY_LOG_FORMAT", value_enum, default_value_t)]
    pub log_format: LogFormat,
}

impl Args {
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub const fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }
}
