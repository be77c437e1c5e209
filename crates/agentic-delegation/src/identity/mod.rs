//! Account references.
//!
//! Every delegation node is controlled by an account. Accounts are derived
//! from the controller's Ed25519 public key.

pub mod account;

pub use account::AccountId;
