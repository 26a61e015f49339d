use std::fmt;
use std::str::FromStr;

use crate::ScanError;

const SHA1_HEX_LEN: usize = 40;
const SHA256_HEX_LEN: usize = 64;

/// A git object identifier in its lowercase hex form.
///
/// Only the two hash widths git knows about are accepted: 40 characters
/// (SHA-1) and 64 characters (SHA-256).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse a full hex object id. Uppercase input is normalized.
    pub fn from_hex(hex: &str) -> Result<Self, ScanError> {
        if !matches!(hex.len(), SHA1_HEX_LEN | SHA256_HEX_LEN)
            || !hex.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(ScanError::InvalidObjectId(hex.to_string()));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// The SHA-1 null id, used by hooks to mark a created or deleted ref.
    pub fn null_sha1() -> Self {
        Self("0".repeat(SHA1_HEX_LEN))
    }

    /// Check if this is the null (all-zeros) id.
    pub fn is_null(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    /// The hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Whether a raw revision string is the all-zero null id of either width.
pub fn is_null_revision(rev: &str) -> bool {
    ObjectId::from_hex(rev).map(|oid| oid.is_null()).unwrap_or(false)
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", &self.0[..8])
    }
}

impl FromStr for ObjectId {
    type Err = ScanError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
