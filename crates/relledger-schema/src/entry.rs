//! Ledger rows and their keys.

use serde::{Deserialize, Serialize};

use crate::flag::TriState;
use crate::platform::normalize;

/// Fully-qualified platform target: the primary key of a ledger row.
///
/// Constructing a key through [`VersionKey::new`] normalizes `os` and `arch`,
/// so two spellings of the same platform always address the same row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionKey {
    /// Product name (e.g. "ledger-agent")
    pub product: String,
    /// Version string, compared lexicographically
    pub version: String,
    /// Canonical operating system token
    pub os: String,
    /// Canonical architecture token
    pub arch: String,
}

impl VersionKey {
    /// Build a key, normalizing the platform tokens.
    pub fn new(
        product: impl Into<String>,
        version: impl Into<String>,
        os: &str,
        arch: &str,
    ) -> Self {
        Self {
            product: product.into(),
            version: version.into(),
            os: normalize(os),
            arch: normalize(arch),
        }
    }

    /// Re-apply normalization to a key that may have been built field by field.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            os: normalize(&self.os),
            arch: normalize(&self.arch),
            ..self
        }
    }
}

impl std::fmt::Display for VersionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}/{}",
            self.product, self.version, self.os, self.arch
        )
    }
}

/// One ledger row: build state for a single platform target.
///
/// Field names match the `versions` table columns, which is also the shape
/// listing clients consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Product name
    pub product: String,
    /// Version string
    pub version: String,
    /// Canonical operating system token
    pub os: String,
    /// Canonical architecture token
    pub arch: String,
    /// Build test outcome
    pub tested: TriState,
    /// Publish outcome
    pub published: TriState,
    /// Packaging outcome
    pub packed: TriState,
    /// Package test outcome
    pub pack_tested: TriState,
    /// Artifact location
    pub url: String,
    /// Source commit the artifact was built from
    pub commit_sha: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_normalizes_platform() {
        let key = VersionKey::new("agent", "1.0", "MacOS", "X86_64");
        assert_eq!(key.os, "apple");
        assert_eq!(key.arch, "amd64");
        assert_eq!(key.to_string(), "agent 1.0 apple/amd64");
    }

    #[test]
    fn entry_serializes_flags_as_integers() {
        let entry = VersionEntry {
            product: "agent".into(),
            version: "1.0".into(),
            os: "linux".into(),
            arch: "arm64".into(),
            tested: TriState::True,
            published: TriState::False,
            packed: TriState::Unset,
            pack_tested: TriState::Unset,
            url: "https://example.com/agent.tar.gz".into(),
            commit_sha: "abc123".into(),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["tested"], 1);
        assert_eq!(value["published"], -1);
        assert_eq!(value["pack_tested"], 0);
        assert_eq!(value["commit_sha"], "abc123");
    }
}
