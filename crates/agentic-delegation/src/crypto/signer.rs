//! Delegate signing.
//!
//! A delegate consents to a position in the hierarchy by signing the
//! node's integrity hash. Key custody lives behind the `Signer` trait so
//! hardware wallets or remote signers can stand in for a local key.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{DelegationError, Result};
use crate::identity::AccountId;

/// Signs messages on behalf of one account.
pub trait Signer: Send + Sync {
    /// The account whose key material this signer holds.
    fn account(&self) -> AccountId;

    /// Sign a message.
    fn sign(&self, message: &[u8]) -> Result<DelegateSignature>;
}

/// A delegate's signature over a node hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateSignature {
    /// Account that produced the signature.
    pub signer: AccountId,
    /// Signer's public key (base64).
    pub public_key: String,
    /// Ed25519 signature (base64).
    pub signature: String,
}

impl DelegateSignature {
    /// Check that `public_key` belongs to `signer` and signed `message`.
    pub fn verify(&self, message: &[u8]) -> Result<()> {
        let verifying_key = self.verifying_key()?;
        if AccountId::from_verifying_key(&verifying_key) != self.signer {
            return Err(DelegationError::SignatureMismatch(format!(
                "public key does not belong to {}",
                self.signer
            )));
        }

        let raw: [u8; 64] = BASE64
            .decode(&self.signature)
            .map_err(|e| DelegationError::InvalidKey(format!("invalid base64 signature: {e}")))?
            .try_into()
            .map_err(|_| DelegationError::InvalidKey("signature must be 64 bytes".into()))?;

        verifying_key
            .verify(message, &Signature::from_bytes(&raw))
            .map_err(|_| DelegationError::SignatureInvalid)
    }

    fn verifying_key(&self) -> Result<VerifyingKey> {
        let raw: [u8; 32] = BASE64
            .decode(&self.public_key)
            .map_err(|e| DelegationError::InvalidKey(format!("invalid base64 public key: {e}")))?
            .try_into()
            .map_err(|_| DelegationError::InvalidKey("public key must be 32 bytes".into()))?;
        VerifyingKey::from_bytes(&raw)
            .map_err(|e| DelegationError::InvalidKey(format!("invalid verifying key: {e}")))
    }
}

/// `Signer` backed by an in-memory Ed25519 key.
pub struct KeyPairSigner {
    signing_key: SigningKey,
}

impl KeyPairSigner {
    /// Create a signer with a fresh random key.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    /// Build a signer from a 32-byte secret. The caller's copy is wiped.
    pub fn from_secret_bytes(secret: &mut [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        secret.zeroize();
        Self { signing_key }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.verifying_key().to_bytes())
    }
}

impl Signer for KeyPairSigner {
    fn account(&self) -> AccountId {
        AccountId::from_verifying_key(&self.verifying_key())
    }

    fn sign(&self, message: &[u8]) -> Result<DelegateSignature> {
        let signature = self.signing_key.sign(message);
        Ok(DelegateSignature {
            signer: self.account(),
            public_key: self.public_key_base64(),
            signature: BASE64.encode(signature.to_bytes()),
        })
    }
}
