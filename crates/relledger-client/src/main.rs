//! relledger - release ledger client

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use relledger_client::{Cli, LedgerClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = LedgerClient::new(&cli.endpoint, &cli.username, &cli.private_key)?;

    let (path, content) = cli.command.request();
    let reply = client.post(path, content).await?;

    println!("{}", reply.status);
    println!("{}", reply.body);
    Ok(())
}
