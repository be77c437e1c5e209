//! AgenticDelegation: permissioned, revocable delegation hierarchies.
//!
//! A hierarchy is a tree of trust rooted at an owner account. Each
//! delegated node grants an account a set of permissions, is consented
//! to by the delegate's signature over an integrity hash, and may be
//! revoked (with its whole subtree) by its owner or any ancestor owner.
//! All canonical state lives on a ledger reached through
//! [`LedgerGateway`]; this crate builds requests and walks the tree.

pub mod attestation;
pub mod config;
pub mod crypto;
pub mod error;
pub mod hierarchy;
pub mod identity;
pub mod ledger;

// Re-export primary types
pub use error::{DelegationError, Result};
pub use identity::AccountId;

// Re-export hierarchy types
pub use hierarchy::{
    generate_hash, AncestorSearch, CTypeHash, DelegatedNode, DelegationNode, DelegationTx,
    HierarchyRoot, NodeId, Permission, Permissions, TreeNavigator,
};

// Re-export ledger types
pub use ledger::{HierarchyDetails, LedgerError, LedgerGateway, MemoryLedger, PendingTx, TxKind};

// Re-export signing and attestation types
pub use attestation::{Attestation, AuthorizationChecker};
pub use config::{LedgerConfig, TraversalConfig};
pub use crypto::{DelegateSignature, KeyPairSigner, Signer};
