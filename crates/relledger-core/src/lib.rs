//! relledger core
//!
//! Tracks release readiness of build artifacts across a
//! (product, version, os, arch) matrix.
//!
//! # Architecture
//!
//! - **Actor Pattern**: The SQLite connection lives on one thread; every
//!   component talks to it through a cloneable [`DbHandle`].
//! - **Signed mutations**: [`SignatureAuthorizer`] gates every write on a
//!   secp256k1 signature from a registered, in-scope user.
//! - **Reactive consistency**: [`ConsistencyEnforcer`] discards version groups
//!   that are incomplete or disagree on their commit.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.relledger/
//! └── ledger.db   # SQLite database (users, versions)
//! ```
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]

pub mod auth;
pub mod cleanup;
pub mod ledger;
pub mod paths;
pub mod signing;
pub mod store;

pub use auth::{AuthError, AuthorizedRequest, SignatureAuthorizer, UserLookup};
pub use cleanup::{CleanupReport, ConsistencyEnforcer};
pub use ledger::VersionLedger;
pub use paths::*;
pub use store::{DbError, DbHandle, LedgerDb, User};
