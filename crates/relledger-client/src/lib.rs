//! relledger - report build facts to a release ledger
//!
//! Every command builds a small JSON `content` object, signs it with the
//! caller's secp256k1 key and posts `{content, username, signature}`.
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use relledger_core::signing::{SigningKey, sign_request, signing_key_from_hex};
use relledger_schema::Flag;
use serde_json::{Value, json};

/// Message signed by `auth`.
pub const AUTH_MESSAGE: &str = "this is a test message";

#[derive(Debug, Parser)]
#[command(name = "relledger")]
#[command(author, version, about = "Report builds to a release ledger")]
pub struct Cli {
    /// Ledger server base URL
    #[arg(long, global = true, env = "ENDPOINT", default_value = "http://localhost:9800")]
    pub endpoint: String,

    /// Username registered on the server
    #[arg(long, global = true, env = "USERNAME", default_value = "")]
    pub username: String,

    /// Hex-encoded 32-byte secp256k1 secret
    #[arg(
        long,
        global = true,
        env = "PRIVATE_KEY",
        hide_env_values = true,
        default_value = ""
    )]
    pub private_key: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record where a build can be downloaded and which commit produced it
    Seturl {
        product: String,
        version: String,
        os: String,
        arch: String,
        url: String,
        commit: String,
    },
    /// Record the test verdict for a build
    Settest(FlagArgs),
    /// Record whether a build was published
    Setpublish(FlagArgs),
    /// Record whether a build was packaged
    Setpack(FlagArgs),
    /// Record the test verdict for a packaged build
    Setpacktest(FlagArgs),
    /// Check that the server accepts our signature for a product
    Auth {
        /// Product the signer expects to be scoped to
        product: String,
    },
}

#[derive(Debug, clap::Args)]
pub struct FlagArgs {
    pub product: String,
    pub version: String,
    pub os: String,
    pub arch: String,
    #[arg(action = ArgAction::Set)]
    pub value: bool,
}

impl Commands {
    /// Route and content for this command.
    pub fn request(&self) -> (&'static str, Value) {
        match self {
            Self::Seturl {
                product,
                version,
                os,
                arch,
                url,
                commit,
            } => (
                "/version/url",
                json!({
                    "product": product,
                    "version": version,
                    "os": os,
                    "arch": arch,
                    "url": url,
                    "commit": commit,
                }),
            ),
            Self::Settest(args) => (route(Flag::Tested), args.content(Flag::Tested)),
            Self::Setpublish(args) => (route(Flag::Published), args.content(Flag::Published)),
            Self::Setpack(args) => (route(Flag::Packed), args.content(Flag::Packed)),
            Self::Setpacktest(args) => (route(Flag::PackTested), args.content(Flag::PackTested)),
            Self::Auth { product } => (
                "/version/auth",
                json!({ "product": product, "msg": AUTH_MESSAGE }),
            ),
        }
    }
}

impl FlagArgs {
    fn content(&self, flag: Flag) -> Value {
        let mut content = json!({
            "product": self.product,
            "version": self.version,
            "os": self.os,
            "arch": self.arch,
        });
        content[flag.request_field()] = Value::Bool(self.value);
        content
    }
}

fn route(flag: Flag) -> &'static str {
    match flag {
        Flag::Tested => "/version/test",
        Flag::Published => "/version/publish",
        Flag::Packed => "/version/pack",
        Flag::PackTested => "/version/packtest",
    }
}

/// Signed poster bound to one endpoint and identity.
#[derive(Debug)]
pub struct LedgerClient {
    endpoint: String,
    username: String,
    key: SigningKey,
    http: reqwest::Client,
}

/// Status and raw body of a server reply.
#[derive(Debug)]
pub struct Reply {
    pub status: reqwest::StatusCode,
    pub body: String,
}

impl LedgerClient {
    /// Rejects a key that is not 32 hex-encoded bytes before anything is sent.
    pub fn new(endpoint: &str, username: &str, private_key: &str) -> Result<Self> {
        let key = signing_key_from_hex(private_key).context("Invalid private key")?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            username: username.to_string(),
            key,
            http: reqwest::Client::new(),
        })
    }

    pub async fn post(&self, path: &str, content: Value) -> Result<Reply> {
        let body = sign_request(content, self.username.clone(), &self.key)?;
        let url = format!("{}{path}", self.endpoint);
        tracing::debug!(%url, username = %self.username, "posting signed request");

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?;
        let status = resp.status();
        let body = resp.text().await.context("Failed to read response body")?;
        Ok(Reply { status, body })
    }
}
