pub mod admin;
pub mod cleanup;
pub mod serve;
pub mod user;

use std::path::PathBuf;

use anyhow::{Context, Result};
use relledger_core::{DbHandle, db_path};

/// Open the ledger file and start its store actor.
pub fn open_db(path: Option<PathBuf>) -> Result<DbHandle> {
    let path = path.unwrap_or_else(db_path);
    tracing::debug!(path = %path.display(), "opening ledger");
    DbHandle::spawn(&path).with_context(|| format!("Failed to open ledger at {}", path.display()))
}

/// Resolves on Ctrl-C so servers can drain in-flight requests.
pub(crate) async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler available; run until killed
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
