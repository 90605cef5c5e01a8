//! Content-derived identity keys
//!
//! Provides [`FactorKey`], a strongly-typed 32-byte SHA-256 digest used to
//! identify factors and factor sets. Keys order and deduplicate; they are not
//! a security boundary.

use sha2::{Digest, Sha256};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte SHA-256 identity key
///
/// Rendered as 64 lowercase hex characters. Byte ordering and hex string
/// ordering agree, so sorting keys sorts their textual form as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactorKey([u8; 32]);

impl FactorKey {
    /// Create a key from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create key from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != 32 {
            return Err(KeyError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Digest arbitrary text
    #[inline]
    #[must_use]
    pub fn digest(text: &str) -> Self {
        let out = Sha256::digest(text.as_bytes());
        Self(out.into())
    }

    /// Key of a composite: the digest of member keys (hex) joined by `,`
    ///
    /// Callers pass members already sorted; the result depends on order.
    #[must_use]
    pub fn composite<'a>(members: impl IntoIterator<Item = &'a FactorKey>) -> Self {
        let joined = members
            .into_iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self::digest(&joined)
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for FactorKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for FactorKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl serde::Serialize for FactorKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for FactorKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct FactorKeyVisitor;

        impl<'de> serde::de::Visitor<'de> for FactorKeyVisitor {
            type Value = FactorKey;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a 32-byte key as a 64 character hex string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_str(FactorKeyVisitor)
    }
}

/// Errors that can occur when parsing keys
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// Invalid key length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
