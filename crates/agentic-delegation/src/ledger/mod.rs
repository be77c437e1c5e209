//! Ledger gateway, the system of record for delegation state.
//!
//! Everything canonical about a hierarchy lives on the ledger: nodes,
//! children lists, hierarchy details and attestation references. This
//! crate only reads through a [`LedgerGateway`] and submits requests to
//! it; the ledger enforces authorization and performs cascading
//! revocation atomically.
//!
//! Read methods return `Ok(None)` (or an empty collection) for unknown
//! ids. Submission failures are reported as [`LedgerError`] and are
//! surfaced to callers unchanged.

pub mod memory;

pub use memory::MemoryLedger;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::crypto::DelegateSignature;
use crate::hierarchy::{CTypeHash, DelegatedNode, DelegationNode, HierarchyRoot, NodeId};
use crate::identity::AccountId;

/// Errors reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Submitter is not authorized to revoke this delegation")]
    UnauthorizedRevocation,

    #[error("Submitter is not the deposit payer of this delegation")]
    UnauthorizedRemoval,

    #[error("Submitter is not authorized to delegate under this parent")]
    UnauthorizedDelegation,

    #[error("Requested revocation bound exceeds the ledger maximum")]
    ExceededRevocationBounds,

    #[error("Subtree is larger than the requested removal bound")]
    ExceededRemovalBounds,

    #[error("Authorization search exhausted max_parent_checks")]
    ExceededParentChecks,

    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    #[error("Delegation not found: {0}")]
    DelegationNotFound(String),

    #[error("Hierarchy not found: {0}")]
    HierarchyNotFound(String),

    #[error("Attestation not found: {0}")]
    AttestationNotFound(String),

    #[error("Delegate signature is invalid")]
    InvalidDelegateSignature,

    #[error("Parent delegation is revoked")]
    ParentRevoked,

    #[error("Parent delegation lacks the DELEGATE permission")]
    MissingDelegatePermission,

    #[error("Ledger rejected submission ({code}): {message}")]
    Rejected { code: u32, message: String },

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Whether the ledger refused the submitter rather than the request.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::UnauthorizedRevocation | Self::UnauthorizedRemoval | Self::UnauthorizedDelegation
        )
    }
}

/// Read-only projection of a hierarchy root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyDetails {
    pub root_id: NodeId,
    pub ctype_hash: CTypeHash,
}

/// Kind of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    StoreRoot,
    StoreDelegation,
    Revoke,
    Remove,
    ReclaimDeposit,
    RevokeAttestation,
}

impl TxKind {
    /// Return a stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StoreRoot => "store_root",
            Self::StoreDelegation => "store_delegation",
            Self::Revoke => "revoke",
            Self::Remove => "remove",
            Self::ReclaimDeposit => "reclaim_deposit",
            Self::RevokeAttestation => "revoke_attestation",
        }
    }
}

/// Handle to a submission accepted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    /// Ledger-assigned transaction hash.
    pub tx_hash: String,
    pub kind: TxKind,
}

/// Access to the delegation ledger.
///
/// The submitting account of store and remove calls is whatever identity
/// the gateway signs transactions with; it becomes (or must match) the
/// recorded deposit payer.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Fetch a node by id.
    async fn query(&self, id: &NodeId) -> Result<Option<DelegationNode>, LedgerError>;

    /// Fetch the ids of a node's direct children.
    async fn get_children(&self, id: &NodeId) -> Result<BTreeSet<NodeId>, LedgerError>;

    /// Fetch the claim hashes of attestations issued under a node.
    async fn get_attestation_hashes(&self, id: &NodeId) -> Result<Vec<String>, LedgerError>;

    /// Fetch the details of a hierarchy by its root id.
    async fn get_hierarchy_details(
        &self,
        root_id: &NodeId,
    ) -> Result<Option<HierarchyDetails>, LedgerError>;

    /// Store a new hierarchy root.
    async fn submit_store_root(&self, root: &HierarchyRoot) -> Result<PendingTx, LedgerError>;

    /// Store a delegated node with its delegate's consent signature.
    async fn submit_store_delegation(
        &self,
        node: &DelegatedNode,
        delegate_signature: &DelegateSignature,
    ) -> Result<PendingTx, LedgerError>;

    /// Revoke a node and cascade to at most `max_revocations` descendants.
    async fn submit_revoke(
        &self,
        id: &NodeId,
        submitter: &AccountId,
        max_parent_checks: u32,
        max_revocations: u32,
    ) -> Result<PendingTx, LedgerError>;

    /// Remove a node and its subtree, releasing their deposits.
    async fn submit_remove(&self, id: &NodeId, max_removals: u32)
        -> Result<PendingTx, LedgerError>;

    /// Reclaim the deposit of a node and its subtree, deleting them.
    async fn submit_reclaim_deposit(
        &self,
        id: &NodeId,
        max_removals: u32,
    ) -> Result<PendingTx, LedgerError>;

    /// Revoke an attestation on behalf of its owner or a delegating ancestor.
    async fn submit_revoke_attestation(
        &self,
        claim_hash: &str,
        submitter: &AccountId,
        max_parent_checks: u32,
    ) -> Result<PendingTx, LedgerError>;

    /// Deposit reserved for each stored node.
    async fn query_deposit_amount(&self) -> Result<u128, LedgerError>;
}
