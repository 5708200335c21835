//! Administrative API server

use std::net::SocketAddr;

use anyhow::{Context, Result};
use relledger_core::{ConsistencyEnforcer, DbHandle};
use tokio::net::TcpListener;

use crate::admin as admin_api;

pub async fn admin(db: DbHandle, bind: SocketAddr, expected_platforms: usize) -> Result<()> {
    let enforcer = ConsistencyEnforcer::new(db).with_expected_platforms(expected_platforms);
    let app = admin_api::router(enforcer);
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;

    tracing::info!("cleanup API listening on http://{bind}");
    axum::serve(listener, app)
        .with_graceful_shutdown(super::shutdown_signal())
        .await
        .context("Cleanup API server failed")
}
