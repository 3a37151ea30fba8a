//! Server mode CLI logic
//!
//! Contains the core logic for running the HTTP bridge.

use crate::{
    cli::init_logging,
    config::{ConfigLoader, ConfigOverrides},
    server::{AppState, create_app},
    session::GeminiClient,
    utils::version,
};
use anyhow::{Context, Result};
use std::{path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;

/// Arguments for server mode
///
/// `None` leaves the value from the config file or environment in place.
#[derive(Debug, Default)]
pub struct ServerArgs {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

/// Run server mode with the given arguments
pub async fn run_server_mode(args: ServerArgs) -> Result<()> {
    let settings = ConfigLoader::new()
        .with_overrides(ConfigOverrides {
            host: args.host,
            port: args.port,
            verbose: args.verbose,
            auto_refresh: None,
        })
        .load(args.config.as_deref())
        .context("Failed to load configuration")?;

    init_logging(&settings.logging.level, settings.logging.verbose);
    tracing::info!("Starting Gemini bridge v{}", version::get_version());

    let client = Arc::new(GeminiClient::new(&settings).context("Failed to create Gemini client")?);
    if let Err(e) = client.init().await {
        tracing::error!("Gemini client initialization failed: {}", e);
        tracing::error!("Check that GEMINI_1PSID (and GEMINI_1PSIDTS if available) are current");
        tracing::error!(
            "Copy fresh cookies from a signed-in browser session at https://gemini.google.com"
        );
        tracing::warn!("Server will start anyway; generation requests will fail until a handshake succeeds");
    }

    let addr = parse_and_bind_address(&settings.server.host, settings.server.port).await?;
    let state = AppState::new(client.clone(), settings);
    let shutdown = state.shutdown.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(
        "Gemini bridge v{} listening on {}",
        version::get_version(),
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    client.close().await;
    tracing::info!("Gemini bridge stopped");
    Ok(())
}

/// Wait for Ctrl-C or SIGTERM, then cancel in-flight work
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}

/// Parse host string and resolve the address to listen on
///
/// Any IP literal is accepted. The IPv6 wildcard `::` is probed first and
/// falls back to `0.0.0.0` when the host has no IPv6 support.
pub async fn parse_and_bind_address(host: &str, port: u16) -> Result<std::net::SocketAddr> {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    let ip = match host.parse::<IpAddr>() {
        Ok(ip) => ip,
        Err(_) => anyhow::bail!(
            "Invalid host address: {}. Use '::' for IPv6 or '0.0.0.0' for IPv4",
            host
        ),
    };
    let addr = SocketAddr::new(ip, port);

    if !matches!(ip, IpAddr::V6(v6) if v6.is_unspecified()) {
        tracing::debug!("Parsed address: {}", addr);
        return Ok(addr);
    }

    // Probe IPv6 support
    match tokio::net::TcpListener::bind(addr).await {
        Ok(_) => {
            tracing::debug!("IPv6 available, using {}", addr);
            Ok(addr)
        }
        Err(e) => {
            tracing::warn!(
                "Could not listen on [::]:{} (Caused by {}), falling back to 0.0.0.0",
                port,
                e
            );
            Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
        }
    }
}
