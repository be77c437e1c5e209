//! Account identifiers.

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DelegationError, Result};

const ACCOUNT_PREFIX: &str = "aid_";
const ACCOUNT_BODY_LEN: usize = 16;

/// Identity reference controlling a delegation node.
///
/// Format: `aid_` + base58 of first 16 bytes of SHA-256(public_key).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    /// Compute an account ID from a verifying (public) key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self::from_public_key_bytes(key.as_bytes())
    }

    /// Compute an account ID from raw public key bytes.
    pub fn from_public_key_bytes(bytes: &[u8]) -> Self {
        let hash = Sha256::digest(bytes);
        let encoded = bs58::encode(&hash[..ACCOUNT_BODY_LEN]).into_string();
        Self(format!("{ACCOUNT_PREFIX}{encoded}"))
    }

    /// Parse and validate an account reference.
    pub fn parse(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(DelegationError::MissingAccount);
        }
        let account = Self(value.to_string());
        if account.is_well_formed() {
            Ok(account)
        } else {
            Err(DelegationError::InvalidAccount(value.to_string()))
        }
    }

    /// Whether this is a well-formed account reference.
    pub fn is_well_formed(&self) -> bool {
        self.0
            .strip_prefix(ACCOUNT_PREFIX)
            .and_then(|body| bs58::decode(body).into_vec().ok())
            .is_some_and(|bytes| bytes.len() == ACCOUNT_BODY_LEN)
    }

    /// Check the account is present and well-formed.
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(DelegationError::MissingAccount);
        }
        if !self.is_well_formed() {
            return Err(DelegationError::InvalidAccount(self.0.clone()));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
