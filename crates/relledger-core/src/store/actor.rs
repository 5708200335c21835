//! DB Actor - Thread-safe access to SQLite
//!
//! SQLite connections are not `Sync`, so the ledger database lives on a
//! dedicated background thread. Callers hold a [`DbHandle`] and exchange
//! messages with that thread; each request suspends the calling task until
//! the answer arrives. The store itself serializes writes, nothing here locks.

use std::fmt;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use relledger_schema::{Flag, ListQuery, VersionEntry, VersionKey};
use tokio::sync::oneshot;

use super::db::{DbError, LedgerDb, User};
use crate::cleanup::CleanupReport;

type Reply<T> = oneshot::Sender<Result<T, DbError>>;

/// Events that can be sent to the DB actor
pub enum DbEvent {
    /// Look up a signer
    GetUser { username: String, resp: Reply<Option<User>> },
    /// Register or replace a signer
    PutUser { user: User, resp: Reply<()> },
    /// Insert or fully replace a row
    UpsertUrl {
        key: VersionKey,
        url: String,
        commit: String,
        resp: Reply<()>,
    },
    /// Set one flag on an existing row
    SetFlag {
        key: VersionKey,
        flag: Flag,
        value: bool,
        resp: Reply<usize>,
    },
    /// Fetch one row
    GetVersion { key: VersionKey, resp: Reply<Option<VersionEntry>> },
    /// Filtered, paginated listing
    ListVersions { query: ListQuery, resp: Reply<Vec<VersionEntry>> },
    /// Row count
    CountVersions { product: Option<String>, resp: Reply<u64> },
    /// Commit of the greatest version
    LatestCommit { product: Option<String>, resp: Reply<Option<String>> },
    /// Both consistency passes
    Cleanup {
        product: Option<String>,
        expected_platforms: usize,
        resp: Reply<CleanupReport>,
    },
    /// Shutdown the actor
    Shutdown,
}

impl fmt::Debug for DbEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetUser { username, .. } => f
                .debug_struct("GetUser")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::PutUser { user, .. } => f
                .debug_struct("PutUser")
                .field("user", user)
                .finish_non_exhaustive(),
            Self::UpsertUrl { key, url, .. } => f
                .debug_struct("UpsertUrl")
                .field("key", key)
                .field("url", url)
                .finish_non_exhaustive(),
            Self::SetFlag {
                key, flag, value, ..
            } => f
                .debug_struct("SetFlag")
                .field("key", key)
                .field("flag", flag)
                .field("value", value)
                .finish_non_exhaustive(),
            Self::GetVersion { key, .. } => f
                .debug_struct("GetVersion")
                .field("key", key)
                .finish_non_exhaustive(),
            Self::ListVersions { query, .. } => f
                .debug_struct("ListVersions")
                .field("query", query)
                .finish_non_exhaustive(),
            Self::CountVersions { product, .. } => f
                .debug_struct("CountVersions")
                .field("product", product)
                .finish_non_exhaustive(),
            Self::LatestCommit { product, .. } => f
                .debug_struct("LatestCommit")
                .field("product", product)
                .finish_non_exhaustive(),
            Self::Cleanup { product, .. } => f
                .debug_struct("Cleanup")
                .field("product", product)
                .finish_non_exhaustive(),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// A handle to the Database Actor that is Send + Sync and Clone.
///
/// This is the explicit store handle every ledger component is built from.
#[derive(Clone)]
pub struct DbHandle {
    sender: mpsc::Sender<DbEvent>,
}

impl fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbHandle").finish_non_exhaustive()
    }
}

impl DbHandle {
    /// Open the ledger at `path` and spawn the actor thread
    pub fn spawn(path: &Path) -> Result<Self, DbError> {
        Ok(Self::from_db(LedgerDb::open_at(path)?))
    }

    /// Spawn the actor thread around an already-open database
    pub fn from_db(db: LedgerDb) -> Self {
        let (sender, receiver) = mpsc::channel();

        thread::spawn(move || {
            run_db_event_loop(db, receiver);
        });

        Self { sender }
    }

    /// In-memory ledger, mostly for tests
    pub fn in_memory() -> Result<Self, DbError> {
        Ok(Self::from_db(LedgerDb::open_in_memory()?))
    }

    /// Ask the actor to stop. Later requests fail with [`DbError::Unavailable`].
    pub fn shutdown(&self) {
        let _ = self.sender.send(DbEvent::Shutdown);
    }

    /// Helper to send a request and wait for the response
    async fn request<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(Reply<T>) -> DbEvent,
    {
        let (tx, rx) = oneshot::channel();
        self.sender.send(f(tx)).map_err(|_| DbError::Unavailable)?;
        rx.await.map_err(|_| DbError::Unavailable)?
    }

    pub async fn get_user(&self, username: String) -> Result<Option<User>, DbError> {
        self.request(|resp| DbEvent::GetUser { username, resp })
            .await
    }

    pub async fn put_user(&self, user: User) -> Result<(), DbError> {
        self.request(|resp| DbEvent::PutUser { user, resp }).await
    }

    pub async fn upsert_url(
        &self,
        key: VersionKey,
        url: String,
        commit: String,
    ) -> Result<(), DbError> {
        self.request(|resp| DbEvent::UpsertUrl {
            key,
            url,
            commit,
            resp,
        })
        .await
    }

    pub async fn set_flag(&self, key: VersionKey, flag: Flag, value: bool) -> Result<usize, DbError> {
        self.request(|resp| DbEvent::SetFlag {
            key,
            flag,
            value,
            resp,
        })
        .await
    }

    pub async fn get_version(&self, key: VersionKey) -> Result<Option<VersionEntry>, DbError> {
        self.request(|resp| DbEvent::GetVersion { key, resp }).await
    }

    pub async fn list_versions(&self, query: ListQuery) -> Result<Vec<VersionEntry>, DbError> {
        self.request(|resp| DbEvent::ListVersions { query, resp })
            .await
    }

    pub async fn count_versions(&self, product: Option<String>) -> Result<u64, DbError> {
        self.request(|resp| DbEvent::CountVersions { product, resp })
            .await
    }

    pub async fn latest_commit(&self, product: Option<String>) -> Result<Option<String>, DbError> {
        self.request(|resp| DbEvent::LatestCommit { product, resp })
            .await
    }

    pub async fn cleanup(
        &self,
        product: Option<String>,
        expected_platforms: usize,
    ) -> Result<CleanupReport, DbError> {
        self.request(|resp| DbEvent::Cleanup {
            product,
            expected_platforms,
            resp,
        })
        .await
    }
}

/// The actual event loop running in the background thread
// The db and receiver are moved into this thread so the actor has
// exclusive ownership of the connection.
#[allow(clippy::needless_pass_by_value)]
fn run_db_event_loop(mut db: LedgerDb, receiver: mpsc::Receiver<DbEvent>) {
    while let Ok(event) = receiver.recv() {
        match event {
            DbEvent::GetUser { username, resp } => {
                let _ = resp.send(db.get_user(&username));
            }
            DbEvent::PutUser { user, resp } => {
                let _ = resp.send(db.put_user(&user));
            }
            DbEvent::UpsertUrl {
                key,
                url,
                commit,
                resp,
            } => {
                let _ = resp.send(db.upsert_url(&key, &url, &commit));
            }
            DbEvent::SetFlag {
                key,
                flag,
                value,
                resp,
            } => {
                let _ = resp.send(db.set_flag(&key, flag, value));
            }
            DbEvent::GetVersion { key, resp } => {
                let _ = resp.send(db.get_version(&key));
            }
            DbEvent::ListVersions { query, resp } => {
                let _ = resp.send(db.list_versions(&query));
            }
            DbEvent::CountVersions { product, resp } => {
                let _ = resp.send(db.count_versions(product.as_deref()));
            }
            DbEvent::LatestCommit { product, resp } => {
                let _ = resp.send(db.latest_commit(product.as_deref()));
            }
            DbEvent::Cleanup {
                product,
                expected_platforms,
                resp,
            } => {
                let _ = resp.send(db.cleanup_versions(product.as_deref(), expected_platforms));
            }
            DbEvent::Shutdown => break,
        }
    }
    tracing::debug!("ledger actor stopped");
}
