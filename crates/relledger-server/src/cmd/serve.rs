//! Public API server

use std::net::SocketAddr;

use anyhow::{Context, Result};
use relledger_core::DbHandle;
use tokio::net::TcpListener;

use crate::api::{self, AppState};

pub async fn serve(db: DbHandle, bind: SocketAddr) -> Result<()> {
    let app = api::router(AppState::new(db));
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;

    tracing::info!("ledger API listening on http://{bind}");
    axum::serve(listener, app)
        .with_graceful_shutdown(super::shutdown_signal())
        .await
        .context("Ledger API server failed")
}
