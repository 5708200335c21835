//! The version ledger: per-platform build state keyed by
//! `(product, version, os, arch)`.
//!
//! Every key and platform filter is normalized here before it reaches the
//! store, whatever the caller already did.

use relledger_schema::{Flag, ListQuery, VersionEntry, VersionKey};
use tracing::{debug, info};

use crate::store::{DbError, DbHandle};

#[derive(Debug, Clone)]
pub struct VersionLedger {
    db: DbHandle,
}

impl VersionLedger {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }

    /// Insert the row at `key`, or replace it outright.
    ///
    /// Replacing is last-writer-wins: url and commit are overwritten and all
    /// four flags go back to unset.
    pub async fn upsert_url(
        &self,
        key: VersionKey,
        url: impl Into<String>,
        commit: impl Into<String>,
    ) -> Result<(), DbError> {
        let key = key.normalized();
        let url = url.into();
        self.db
            .upsert_url(key.clone(), url.clone(), commit.into())
            .await?;
        info!(%key, %url, "set version url");
        Ok(())
    }

    /// Record a lifecycle outcome on an existing row.
    ///
    /// A key with no row is left alone: nothing is created and no error is
    /// raised. Returns whether a row was updated.
    pub async fn set_flag(&self, key: VersionKey, flag: Flag, value: bool) -> Result<bool, DbError> {
        let key = key.normalized();
        let changed = self.db.set_flag(key.clone(), flag, value).await?;
        if changed == 0 {
            debug!(%key, %flag, "flag update matched no row");
        } else {
            info!(%key, %flag, value, "set version flag");
        }
        Ok(changed > 0)
    }

    /// Fetch one row.
    pub async fn get(&self, key: VersionKey) -> Result<Option<VersionEntry>, DbError> {
        self.db.get_version(key.normalized()).await
    }

    /// Rows matching every filter in `query`, newest version string first.
    pub async fn list_versions(&self, query: ListQuery) -> Result<Vec<VersionEntry>, DbError> {
        let query = query.normalized();
        debug!(?query, "listing versions");
        self.db.list_versions(query).await
    }

    /// Number of rows, optionally for one product.
    pub async fn count_versions(&self, product: Option<String>) -> Result<u64, DbError> {
        self.db.count_versions(product).await
    }

    /// Commit of the row with the lexicographically greatest version.
    pub async fn latest_commit(&self, product: Option<String>) -> Result<Option<String>, DbError> {
        self.db.latest_commit(product).await
    }
}
