use dirs::home_dir;
use std::path::PathBuf;

/// Returns the ledger home directory, or None if the user's home cannot be resolved.
pub fn try_relledger_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("RELLEDGER_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".relledger"))
}

/// Returns the ledger home directory (`~/.relledger`), falling back to the
/// working directory when no home can be resolved.
pub fn relledger_home() -> PathBuf {
    try_relledger_home().unwrap_or_else(|| PathBuf::from("."))
}

/// `SQLite` database path: ~/.relledger/ledger.db
pub fn db_path() -> PathBuf {
    relledger_home().join("ledger.db")
}
