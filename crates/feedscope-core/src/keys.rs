//! Public keys.
//!
//! Feeds, spaces, identities and devices are all addressed by a
//! [`PublicKey`]. The key is an opaque byte string; equality, hashing and
//! ordering use the full bytes while [`PublicKey::truncate`] gives the short
//! form used in labels and node ids.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{CoreError, Result};

/// Number of hex characters kept by [`PublicKey::truncate`].
pub const TRUNCATED_HEX_LEN: usize = 8;

/// Opaque public key identifying a feed, space, identity or device.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    /// Length in bytes of keys produced by [`PublicKey::random`].
    pub const LENGTH: usize = 32;

    /// Wrap raw key bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse a hex-encoded key.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| CoreError::InvalidKey(format!("{s}: {e}")))?;
        if bytes.is_empty() {
            return Err(CoreError::InvalidKey("empty key".into()));
        }
        Ok(Self(bytes))
    }

    /// Generate a random 32-byte key.
    #[must_use]
    pub fn random() -> Self {
        let bytes: [u8; Self::LENGTH] = rand::random();
        Self(bytes.to_vec())
    }

    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Full lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Short hex rendering for display.
    #[must_use]
    pub fn truncate(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(TRUNCATED_HEX_LEN);
        hex
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.truncate())
    }
}

impl FromStr for PublicKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
