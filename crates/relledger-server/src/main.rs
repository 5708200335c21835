//! relledger-server - release ledger HTTP front end

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use relledger_server::cmd;
use relledger_server::{Cli, Commands, UserCommands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let db = cmd::open_db(cli.db)?;

    match cli.command {
        Commands::Serve { bind } => cmd::serve::serve(db, bind).await,
        Commands::Admin {
            bind,
            expected_platforms,
        } => cmd::admin::admin(db, bind, expected_platforms).await,
        Commands::Cleanup {
            product,
            expected_platforms,
        } => cmd::cleanup::cleanup(db, product, expected_platforms).await,
        Commands::User { command } => match command {
            UserCommands::Add {
                username,
                key,
                scopes,
            } => cmd::user::add(db, username, key, scopes).await,
            UserCommands::Show { username } => cmd::user::show(db, username).await,
        },
    }
}
