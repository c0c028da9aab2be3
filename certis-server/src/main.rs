//! Certis Server - REST API for academic certificate issuance and verification
//!
//! Exposes certis-core functionality via HTTP endpoints:
//! - POST /auth/login, /auth/logout - Operator sessions
//! - POST /certificates - Issue a certificate (PDF + QR code)
//! - POST /verify - Verify a certificate fingerprint

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use certis_server::{create_router, AppState, Config};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("certis_server=info,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env();
    let addr = config.socket_addr();

    let state = AppState::from_config(config)
        .await
        .context("Failed to open certificate stores")?;

    state
        .ensure_bootstrap_admin()
        .await
        .context("Failed to provision bootstrap admin")?;

    if state.admins.count().await.context("Failed to read admin store")? == 0 {
        tracing::warn!(
            "No admin accounts provisioned; run `certis provision-admin` or set ADMIN_BOOTSTRAP_USERNAME/ADMIN_BOOTSTRAP_PASSWORD"
        );
    }

    let cleanup = state.spawn_session_cleanup();
    let app = create_router(state);

    tracing::info!("Certis server listening on {}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    cleanup.abort();
    tracing::info!("Server stopped");

    Ok(())
}
