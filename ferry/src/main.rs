#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;
mod logging;

use std::sync::Arc;

use anyhow::Context;
use args::Args;
use clap::Parser;
use ferry_config::{EnvSecretStore, RoutingTable, SecretStore, ServerConfig};
use ferry_llm::{HttpProviderFactory, ModelRouter};
use ferry_server::Server;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logging::init(args.log_format, "info")?;

    // Load the routing table; a bad table is fatal
    let table = RoutingTable::load(args.routes.as_deref(), args.routes_file.as_deref())
        .context("failed to load routing configuration")?;

    tracing::info!(
        models = table.len(),
        listen = %args.listen,
        "starting ferry"
    );

    // One connection pool shared by every adapter; streams have no overall deadline
    let client = reqwest::Client::builder()
        .connect_timeout(args.connect_timeout())
        .read_timeout(args.read_timeout())
        .build()
        .context("failed to build HTTP client")?;

    let secrets: Arc<dyn SecretStore> = Arc::new(EnvSecretStore);
    let factory = HttpProviderFactory::new(client, Arc::clone(&secrets));
    let router = ModelRouter::new(Arc::new(table), Arc::new(factory), secrets);

    let config = ServerConfig {
        listen_address: args.listen,
        auth_token: args.auth_token.filter(|t| !t.is_empty()).map(SecretString::from),
    };
    let server = Server::new(config, router);

    // Set up graceful shutdown
    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();

    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_clone.cancel();
    });

    server.serve(shutdown).await?;

    tracing::info!("ferry stopped");
    Ok(())
}

/// Wait for a shutdown signal (`SIGINT` or `SIGTERM`)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
