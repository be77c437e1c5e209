//! Delegation hierarchies: permissioned, revocable trust trees.
//!
//! The hierarchy module provides:
//! - Permission bit flags (`ATTEST`, `DELEGATE`)
//! - The integrity hash delegates sign to consent to a position
//! - Root and delegated node values with their ledger operations
//! - Iterative subtree counting and ancestor search
//! - Submission requests for store, revoke and remove

pub mod hash;
pub mod id;
pub mod navigator;
pub mod node;
pub mod permission;
pub mod tx;

pub use hash::{generate_hash, generate_hash_bytes};
pub use id::{CTypeHash, NodeId};
pub use navigator::{AncestorSearch, TreeNavigator};
pub use node::{DelegatedNode, DelegationNode, HierarchyRoot};
pub use permission::{Permission, Permissions};
pub use tx::DelegationTx;
