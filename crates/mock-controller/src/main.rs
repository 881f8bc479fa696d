//! Mock controller binary.
//!
//! Serves a [`MemoryController`] seeded with the `Default` organization and
//! the stock credential types on `MOCK_CONTROLLER_PORT` (default `8013`).
//! Credentials are provisioned through `POST /api/v2/credentials/`.

use anyhow::Context;
use credsource_sdk::{CredentialLookup, MemoryController};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let controller = MemoryController::with_defaults();
    for ty in controller.credential_types().await? {
        info!(id = %ty.id, name = %ty.name, kind = %ty.kind, "credential type seeded");
    }

    let port = mock_controller::port_from_env();
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(address = %addr, "mock controller listening");
    axum::serve(listener, mock_controller::router(controller))
        .await
        .context("server error")?;
    Ok(())
}
