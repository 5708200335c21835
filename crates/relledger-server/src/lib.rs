//! relledger server
//!
//! Two HTTP front ends over one ledger file:
//!
//! - `serve`: the public API. Signed POSTs mutate, GETs list and count.
//! - `admin`: the cleanup trigger, meant for a private interface.
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]

pub mod admin;
pub mod api;
pub mod cmd;
pub mod error;

use clap::{Parser, Subcommand};
use relledger_schema::SUPPORTED_PLATFORM_COUNT;
use std::net::SocketAddr;
use std::path::PathBuf;

pub use api::AppState;
pub use error::ApiError;

#[derive(Debug, Parser)]
#[command(name = "relledger-server")]
#[command(author, version, about = "Release readiness ledger server")]
pub struct Cli {
    /// Ledger database file (defaults to ~/.relledger/ledger.db)
    #[arg(long, global = true, env = "RELLEDGER_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the public ledger API
    Serve {
        /// Address to listen on
        #[arg(long, env = "RELLEDGER_BIND", default_value = "127.0.0.1:9800")]
        bind: SocketAddr,
    },
    /// Serve the administrative cleanup API
    Admin {
        /// Address to listen on
        #[arg(long, env = "RELLEDGER_ADMIN_BIND", default_value = "127.0.0.1:9801")]
        bind: SocketAddr,
        /// Platform rows a version needs to count as complete
        #[arg(long, default_value_t = SUPPORTED_PLATFORM_COUNT)]
        expected_platforms: usize,
    },
    /// Run the consistency passes once and exit
    Cleanup {
        /// Only clean up this product
        #[arg(long)]
        product: Option<String>,
        /// Platform rows a version needs to count as complete
        #[arg(long, default_value_t = SUPPORTED_PLATFORM_COUNT)]
        expected_platforms: usize,
    },
    /// Manage registered signers
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum UserCommands {
    /// Register a signer, replacing any existing one with the same name
    Add {
        /// Username clients sign as
        username: String,
        /// Hex-encoded 32-byte secp256k1 secret
        #[arg(long, env = "RELLEDGER_USER_KEY", hide_env_values = true)]
        key: String,
        /// Product the signer may mutate (repeatable)
        #[arg(long = "scope", required = true)]
        scopes: Vec<String>,
    },
    /// Show a signer's scopes
    Show {
        /// Username to look up
        username: String,
    },
}
