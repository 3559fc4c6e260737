//! Content identifiers
//!
//! Thin wrapper over [`cid::Cid`]. The client never interprets an identifier
//! beyond checking that it parses; derivation lives with the block store.

use crate::error::{ContentStoreError, Result};
use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Multicodec for raw bytes
pub const RAW_CODEC: u64 = 0x55;

/// Multicodec for JSON
pub const JSON_CODEC: u64 = 0x0200;

/// Parsed content identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentId(Cid);

impl ContentId {
    /// Parse a CID string, mapping failures to `InvalidIdentifier`
    pub fn parse(id: &str) -> Result<Self> {
        Cid::from_str(id)
            .map(ContentId)
            .map_err(|e| ContentStoreError::InvalidIdentifier {
                id: id.to_string(),
                reason: e.to_string(),
            })
    }

    /// CIDv1 over the sha2-256 digest of `data` with the given codec
    pub fn for_data(codec: u64, data: &[u8]) -> Self {
        let hash = Code::Sha2_256.digest(data);
        ContentId(Cid::new_v1(codec, hash))
    }

    /// CIDv1 for raw bytes
    pub fn raw(data: &[u8]) -> Self {
        Self::for_data(RAW_CODEC, data)
    }

    /// CIDv1 for a JSON encoding
    pub fn json(encoded: &[u8]) -> Self {
        Self::for_data(JSON_CODEC, encoded)
    }

    pub fn codec(&self) -> u64 {
        self.0.codec()
    }

    pub fn cid(&self) -> &Cid {
        &self.0
    }

    /// Recompute the digest of `data` with this CID's hash function and compare
    pub fn matches(&self, data: &[u8]) -> bool {
        match Code::try_from(self.0.hash().code()) {
            Ok(code) => code.digest(data) == *self.0.hash(),
            Err(_) => false,
        }
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentId {
    type Err = ContentStoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Cid> for ContentId {
    fn from(cid: Cid) -> Self {
        ContentId(cid)
    }
}

impl Serialize for ContentId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ContentId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Check whether `id` parses as a content identifier
pub fn is_valid_identifier(id: &str) -> bool {
    Cid::from_str(id).is_ok()
}
