//! Lifecycle flags recorded per ledger row.

use serde::{Deserialize, Serialize};

/// Outcome of one lifecycle stage for a build artifact.
///
/// Persisted and serialized as a signed integer (`0`, `1`, `-1`) so rows stay
/// bit-compatible with existing ledgers and with downstream release tooling.
///
/// # Example
///
/// ```
/// use relledger_schema::TriState;
///
/// assert_eq!(TriState::from(true), TriState::True);
/// assert_eq!(i64::from(TriState::False), -1);
/// assert_eq!(TriState::try_from(0_i64).unwrap(), TriState::Unset);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum TriState {
    /// The stage has not been reported yet.
    #[default]
    Unset,
    /// The stage was reported as successful.
    True,
    /// The stage was reported as failed.
    False,
}

/// Errors that can occur when decoding a [`TriState`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FlagError {
    /// A stored flag held something other than `-1`, `0`, or `1`.
    #[error("Invalid flag value: {0}")]
    InvalidValue(i64),
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl From<TriState> for i64 {
    fn from(state: TriState) -> Self {
        match state {
            TriState::Unset => 0,
            TriState::True => 1,
            TriState::False => -1,
        }
    }
}

impl TryFrom<i64> for TriState {
    type Error = FlagError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unset),
            1 => Ok(Self::True),
            -1 => Ok(Self::False),
            other => Err(FlagError::InvalidValue(other)),
        }
    }
}

/// The four lifecycle stages tracked for every platform target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Build was tested.
    Tested,
    /// Build was published.
    Published,
    /// Build was packaged.
    Packed,
    /// Package was tested.
    PackTested,
}

impl Flag {
    /// Column holding this flag in the `versions` table.
    pub fn column(self) -> &'static str {
        match self {
            Self::Tested => "tested",
            Self::Published => "published",
            Self::Packed => "packed",
            Self::PackTested => "pack_tested",
        }
    }

    /// Name of the boolean field carrying this flag in a signed request body.
    ///
    /// Pack-test reports reuse the `tested` field; existing clients sign that shape.
    pub fn request_field(self) -> &'static str {
        match self {
            Self::Tested | Self::PackTested => "tested",
            Self::Published => "published",
            Self::Packed => "packed",
        }
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}
