//! One-shot cleanup command

use anyhow::{Context, Result};
use relledger_core::{ConsistencyEnforcer, DbHandle};

pub async fn cleanup(db: DbHandle, product: Option<String>, expected_platforms: usize) -> Result<()> {
    let report = ConsistencyEnforcer::new(db)
        .with_expected_platforms(expected_platforms)
        .run(product)
        .await
        .context("Failed to cleanup versions")?;

    println!(
        "removed {} rows ({} incomplete, {} divergent)",
        report.total(),
        report.incomplete_rows,
        report.divergent_rows
    );
    Ok(())
}
