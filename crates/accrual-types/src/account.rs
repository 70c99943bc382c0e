//! Account identities.
//!
//! Every participant in the ledger (the administrator, each vault) is
//! addressed by a 32-byte [`AccountId`]. The all-zero id is reserved and
//! never identifies a vault.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// Error parsing an [`AccountId`] from text.
#[derive(Debug, thiserror::Error)]
pub enum AccountIdError {
    /// The input was not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The decoded input had the wrong length.
    #[error("account id must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// A 32-byte account identity, serialized as lowercase hex.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(#[serde_as(as = "serde_with::hex::Hex")] [u8; 32]);

impl AccountId {
    /// The reserved all-zero identity.
    pub const ZERO: AccountId = AccountId([0u8; 32]);

    /// Wrap raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive an identity from a human-readable label with BLAKE3.
    ///
    /// Used by configuration files and replay scenarios so that accounts
    /// can be written as `"alice"` instead of 64 hex characters.
    pub fn from_label(label: &str) -> Self {
        Self(*blake3::hash(label.as_bytes()).as_bytes())
    }

    /// Parse a 64-character hex id, or fall back to [`AccountId::from_label`].
    pub fn resolve(text: &str) -> Self {
        text.parse::<Self>().unwrap_or_else(|_| Self::from_label(text))
    }

    /// Whether this is the reserved all-zero identity.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let len = bytes.len();
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AccountIdError::InvalidLength(len))?;
        Ok(Self(arr))
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({}..)", &self.to_hex()[..8])
    }
}
