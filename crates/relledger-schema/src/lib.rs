//! Shared types for the release ledger.
//!
//! Everything here is pure data: platform-token normalization, the tri-state
//! lifecycle flags, ledger rows, and the JSON bodies exchanged between the
//! signing client and the server. No I/O happens in this crate.

pub mod entry;
pub mod flag;
pub mod platform;
pub mod query;
pub mod wire;

// Re-exports
pub use entry::{VersionEntry, VersionKey};
pub use flag::{Flag, FlagError, TriState};
pub use platform::{normalize, normalize_all, normalize_content};
pub use query::ListQuery;
pub use wire::*;

/// Number of (os, arch) rows a `(product, version)` group must carry before
/// it counts as complete: three operating systems times two architectures.
pub const SUPPORTED_PLATFORM_COUNT: usize = 6;
