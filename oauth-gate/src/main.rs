mod http;
mod login_state;
mod users;

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use oauth_gate_core::{
    bootstrap::{load_config, seed_settings},
    logging,
    oauth2::ReqwestTransport,
};

use http::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = load_config()?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("OAuth gate starting...");
    info!("HTTP address: {}", config.http_address());
    info!("Public URL: {}", config.server.base_url);

    // 3. Provider settings and HTTP client
    let settings = Arc::new(seed_settings(&config));
    let transport = Arc::new(ReqwestTransport::new()?);

    let state = AppState::new(settings, transport, &config.server.base_url);
    let enabled: Vec<_> = state
        .flows
        .iter()
        .filter(|flow| flow.is_enabled())
        .map(|flow| flow.name())
        .collect();
    if enabled.is_empty() {
        warn!("No OAuth2 provider is enabled; every login will be refused");
    } else {
        info!("Enabled providers: {}", enabled.join(", "));
    }

    // 4. Serve until shutdown
    let listener = TcpListener::bind(config.http_address()).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("OAuth gate stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C, shutting down"); }
        () = terminate => { info!("Received SIGTERM, shutting down"); }
    }
}
