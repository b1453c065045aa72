//! Identifiers used throughout StrikeVault.
//!
//! Accounts are 20-byte addresses rendered as `0x`-prefixed hex. A series
//! is identified by a UUIDv7 so that ids sort by creation time.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{StrikevaultError, constants};

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// An account on the option ledger or on an external asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Deterministic address: the first 20 bytes of
    /// `SHA-256(domain || seed)`.
    #[must_use]
    pub fn derive(domain: &[u8], seed: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        hasher.update(seed);
        let hash = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[..20]);
        Self(bytes)
    }

    /// Parse a 40-digit hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(digits)
            .map_err(|e| StrikevaultError::Configuration(format!("address {s:?}: {e}")))?;
        let bytes: [u8; 20] = raw.try_into().map_err(|_| {
            StrikevaultError::Configuration(format!("address {s:?}: expected 20 bytes"))
        })?;
        Ok(Self(bytes))
    }

    /// First four bytes in hex, for compact log fields.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = StrikevaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Random addresses for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random::<[u8; 20]>())
    }
}

// ---------------------------------------------------------------------------
// SeriesId
// ---------------------------------------------------------------------------

/// Unique identifier of one option series. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SeriesId(pub Uuid);

impl SeriesId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The custody address a vault for this series holds its pools under.
    #[must_use]
    pub fn vault_address(&self) -> Address {
        Address::derive(constants::VAULT_ADDRESS_DOMAIN, self.0.as_bytes())
    }
}

impl Default for SeriesId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "series:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
