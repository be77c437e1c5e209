//! Hex hash identifiers.
//!
//! Node ids, hierarchy ids and ctype hashes share one wire format:
//! `0x` followed by 64 hex characters (32 raw bytes).

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{DelegationError, Result};

/// Length in bytes of every hash-style identifier.
pub const HASH_LEN: usize = 32;

/// Check whether `value` is a canonical hex hash: `0x` and 64 lowercase
/// hex characters.
///
/// Ids are compared and used as ledger keys by their text, so only the
/// lowercase spelling is well-formed. Use [`normalize_hex_hash`] on input.
pub fn is_hex_hash(value: &str) -> bool {
    match value.strip_prefix("0x") {
        Some(body) => {
            body.len() == HASH_LEN * 2
                && body.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        }
        None => false,
    }
}

/// Lowercase a hex hash written in either case; `None` if malformed.
pub fn normalize_hex_hash(value: &str) -> Option<String> {
    let lower = value.to_ascii_lowercase();
    is_hex_hash(&lower).then_some(lower)
}

/// Decode a `0x`-prefixed hex hash into raw bytes.
///
/// Returns `None` when the string is not a well-formed hash.
pub fn decode_hex_hash(value: &str) -> Option<[u8; HASH_LEN]> {
    if !is_hex_hash(value) {
        return None;
    }
    let mut out = [0u8; HASH_LEN];
    hex::decode_to_slice(&value[2..], &mut out).ok()?;
    Some(out)
}

/// Encode raw bytes as a lowercase `0x`-prefixed hex string.
pub fn encode_hex_hash(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Identifier of a delegation node (and, for roots, of the whole hierarchy).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Generate a fresh random node id.
    pub fn random() -> Self {
        let mut bytes = [0u8; HASH_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_bytes(bytes)
    }

    /// Build a node id from raw bytes.
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(encode_hex_hash(&bytes))
    }

    /// Parse a node id written in either case.
    pub fn parse(value: &str) -> Result<Self> {
        normalize_hex_hash(value)
            .map(Self)
            .ok_or_else(|| DelegationError::InvalidId(value.to_string()))
    }

    /// Whether this id is a well-formed hex hash.
    pub fn is_well_formed(&self) -> bool {
        is_hex_hash(&self.0)
    }

    /// Raw bytes of the id, if well-formed.
    pub fn to_bytes(&self) -> Option<[u8; HASH_LEN]> {
        decode_hex_hash(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash of the claim schema a hierarchy is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CTypeHash(pub String);

impl CTypeHash {
    /// Parse and validate a ctype hash.
    pub fn parse(value: &str) -> Result<Self> {
        normalize_hex_hash(value)
            .map(Self)
            .ok_or_else(|| DelegationError::InvalidCTypeHash(value.to_string()))
    }

    /// Whether this hash is a well-formed hex hash.
    pub fn is_well_formed(&self) -> bool {
        is_hex_hash(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CTypeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
