//! SQLite ledger database
//!
//! Holds registered signers and per-platform build state. Every statement
//! here is a single atomic write or runs inside one transaction, so a failed
//! call never leaves a half-applied change behind.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use relledger_schema::{Flag, ListQuery, TriState, VersionEntry, VersionKey};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use thiserror::Error;

use super::filter::Filter;
use crate::cleanup::{self, CleanupReport};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The store actor has shut down or was never started.
    #[error("Ledger storage is unavailable")]
    Unavailable,
}

impl DbError {
    /// Whether the store could not be reached at all, as opposed to failing mid-call.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

/// Registered signer.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    /// Hex-encoded 32-byte secret
    pub key_material: String,
    /// Products this user may mutate
    pub scopes: Vec<String>,
}

impl User {
    pub fn has_scope(&self, product: &str) -> bool {
        self.scopes.iter().any(|scope| scope == product)
    }
}

// Key material stays out of logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

const ENTRY_COLUMNS: &str =
    "product, version, os, arch, tested, published, packed, pack_tested, url, commit_sha";

/// Ledger database
pub struct LedgerDb {
    conn: Connection,
}

impl fmt::Debug for LedgerDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerDb")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl LedgerDb {
    /// Open or create the ledger at a specific path
    pub fn open_at(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        // WAL lets the public and admin servers share one file
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Throwaway ledger that lives only as long as this value
    pub fn open_in_memory() -> Result<Self, DbError> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                username TEXT NOT NULL PRIMARY KEY,
                key_material TEXT NOT NULL,
                scopes TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS versions (
                product TEXT NOT NULL,
                version TEXT NOT NULL,
                os TEXT NOT NULL,
                arch TEXT NOT NULL,
                tested INTEGER NOT NULL DEFAULT 0,
                published INTEGER NOT NULL DEFAULT 0,
                packed INTEGER NOT NULL DEFAULT 0,
                pack_tested INTEGER NOT NULL DEFAULT 0,
                url TEXT NOT NULL,
                commit_sha TEXT NOT NULL,
                PRIMARY KEY (product, version, os, arch)
            );
            ",
        )?;
        Ok(())
    }

    /// Look up a signer
    pub fn get_user(&self, username: &str) -> Result<Option<User>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT key_material, scopes FROM users WHERE username = ?1",
                params![username],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((key_material, scopes)) = row else {
            return Ok(None);
        };

        Ok(Some(User {
            username: username.to_string(),
            key_material,
            scopes: serde_json::from_str(&scopes)?,
        }))
    }

    /// Register or replace a signer. Provisioning only; the API never calls this.
    pub fn put_user(&self, user: &User) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO users (username, key_material, scopes) VALUES (?1, ?2, ?3)",
            params![
                user.username,
                user.key_material,
                serde_json::to_string(&user.scopes)?
            ],
        )?;
        Ok(())
    }

    /// Insert or fully replace the row at `key`, resetting every flag.
    pub fn upsert_url(&self, key: &VersionKey, url: &str, commit: &str) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO versions (product, version, os, arch, url, commit_sha)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![key.product, key.version, key.os, key.arch, url, commit],
        )?;
        Ok(())
    }

    /// Set one flag on an existing row. Returns the number of rows touched (0 or 1).
    pub fn set_flag(&self, key: &VersionKey, flag: Flag, value: bool) -> Result<usize, DbError> {
        let sql = format!(
            "UPDATE versions SET {} = ?1
             WHERE product = ?2 AND version = ?3 AND os = ?4 AND arch = ?5",
            flag.column()
        );
        let changed = self.conn.execute(
            &sql,
            params![
                i64::from(TriState::from(value)),
                key.product,
                key.version,
                key.os,
                key.arch
            ],
        )?;
        Ok(changed)
    }

    /// Fetch a single row
    pub fn get_version(&self, key: &VersionKey) -> Result<Option<VersionEntry>, DbError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM versions
             WHERE product = ?1 AND version = ?2 AND os = ?3 AND arch = ?4"
        );
        self.conn
            .query_row(
                &sql,
                params![key.product, key.version, key.os, key.arch],
                entry_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Rows matching `query`, newest version first (plain string order)
    pub fn list_versions(&self, query: &ListQuery) -> Result<Vec<VersionEntry>, DbError> {
        let filter = Filter::from(query);
        let mut sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM versions{} ORDER BY version DESC, product, os, arch",
            filter.where_clause()
        );

        let mut extra = Vec::new();
        if let Some((limit, offset)) = query.window() {
            sql.push_str(" LIMIT ? OFFSET ?");
            extra.push(SqlValue::Integer(limit));
            extra.push(SqlValue::Integer(offset));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(filter.into_params(extra)), entry_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Number of rows, optionally for one product
    pub fn count_versions(&self, product: Option<&str>) -> Result<u64, DbError> {
        let filter = Filter::new().eq("product", product);
        let sql = format!("SELECT COUNT(*) FROM versions{}", filter.where_clause());
        let count: i64 = self.conn.query_row(
            &sql,
            params_from_iter(filter.into_params([])),
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Commit of the row with the greatest version string
    pub fn latest_commit(&self, product: Option<&str>) -> Result<Option<String>, DbError> {
        let filter = Filter::new().eq("product", product);
        let sql = format!(
            "SELECT commit_sha FROM versions{} ORDER BY version DESC LIMIT 1",
            filter.where_clause()
        );
        self.conn
            .query_row(&sql, params_from_iter(filter.into_params([])), |row| {
                row.get(0)
            })
            .optional()
            .map_err(Into::into)
    }

    /// Run both consistency passes in one transaction.
    pub fn cleanup_versions(
        &mut self,
        product: Option<&str>,
        expected_platforms: usize,
    ) -> Result<CleanupReport, DbError> {
        let tx = self.conn.transaction()?;
        let incomplete = cleanup::delete_incomplete_groups(&tx, product, expected_platforms)?;
        let divergent = cleanup::delete_divergent_groups(&tx, product)?;
        tx.commit()?;

        Ok(CleanupReport {
            incomplete_rows: incomplete,
            divergent_rows: divergent,
        })
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<VersionEntry> {
    Ok(VersionEntry {
        product: row.get(0)?,
        version: row.get(1)?,
        os: row.get(2)?,
        arch: row.get(3)?,
        tested: tristate(row, 4)?,
        published: tristate(row, 5)?,
        packed: tristate(row, 6)?,
        pack_tested: tristate(row, 7)?,
        url: row.get(8)?,
        commit_sha: row.get(9)?,
    })
}

fn tristate(row: &Row<'_>, idx: usize) -> rusqlite::Result<TriState> {
    let raw: i64 = row.get(idx)?;
    TriState::try_from(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}
