//! Short SHA-256 digests used to derive fallback asset names

use sha2::{Digest, Sha256};
use std::fmt;

/// Number of hex characters kept by [`Checksum::short`]
pub const SHORT_LEN: usize = 8;

/// SHA-256 digest of a filename
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum of a filename
    pub fn of_name(name: &str) -> Self {
        Self::from_bytes(name.as_bytes())
    }

    /// Get the full hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading hex characters, enough to tell fallback names apart
    pub fn short(&self) -> &str {
        &self.0[..SHORT_LEN]
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
