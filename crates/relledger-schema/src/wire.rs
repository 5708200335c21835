//! JSON bodies exchanged between the signing client and the server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entry::VersionEntry;

/// A signed mutation request.
///
/// `signature` is the hex-encoded compact ECDSA signature over the SHA-256 of
/// `content` serialized in field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedRequest {
    /// Request payload; must carry at least `product`
    pub content: Value,
    /// Registered signer
    pub username: String,
    /// Hex-encoded 64-byte `r || s` signature
    pub signature: String,
}

/// Platform target fields shared by every mutation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetContent {
    /// Product name
    pub product: String,
    /// Version string
    pub version: String,
    /// Operating system token
    pub os: String,
    /// Architecture token
    pub arch: String,
}

impl TargetContent {
    /// Whether every key field carries a value.
    pub fn is_complete(&self) -> bool {
        [&self.product, &self.version, &self.os, &self.arch]
            .iter()
            .all(|field| !field.is_empty())
    }
}

/// Payload of a URL report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlContent {
    /// Platform target
    #[serde(flatten)]
    pub target: TargetContent,
    /// Artifact location
    pub url: String,
    /// Source commit
    pub commit: String,
}

/// Successful mutation acknowledgement: `{"result": 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Always `1`
    pub result: u8,
}

impl Ack {
    /// The one acknowledgement value.
    pub const OK: Self = Self { result: 1 };
}

/// Reply to an authentication check: the accepted content echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthEcho {
    /// Always `1`
    pub result: u8,
    /// The verified content
    pub request: Value,
}

/// One page of ledger rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionPage {
    /// Matching rows, newest version first
    pub items: Vec<VersionEntry>,
    /// Page that was requested
    pub page_num: u32,
    /// Page size that was requested; `0` when unpaginated
    pub page_size: u32,
}

/// Row count reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Total {
    /// Number of matching rows
    pub total: u64,
}

/// Latest commit reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestCommit {
    /// Commit of the lexicographically greatest version
    pub commit_sha: String,
}

/// Error reply: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason
    pub error: String,
}
