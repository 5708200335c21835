pub mod actor;
pub mod db;
pub(crate) mod filter;

pub use actor::DbHandle;
pub use db::{DbError, LedgerDb, User};
