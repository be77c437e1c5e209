//! Ed25519 signing for delegate consent.
//!
//! The `Signer` trait is the seam through which delegates sign a node's
//! integrity hash; `KeyPairSigner` keeps the key in memory.

pub mod signer;

pub use signer::{DelegateSignature, KeyPairSigner, Signer};
