//! Ledger submission requests.
//!
//! Requests are plain values built (and validated) locally; `submit` hands
//! them to a [`LedgerGateway`]. Exactly-once execution is the ledger's job.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::crypto::DelegateSignature;
use crate::error::Result;
use crate::identity::AccountId;
use crate::ledger::{LedgerGateway, PendingTx, TxKind};

use super::id::NodeId;
use super::node::{DelegatedNode, HierarchyRoot};

/// A request ready to be submitted to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DelegationTx {
    StoreRoot(HierarchyRoot),
    StoreDelegation {
        node: DelegatedNode,
        signature: DelegateSignature,
    },
    Revoke {
        id: NodeId,
        submitter: AccountId,
        max_parent_checks: u32,
        max_revocations: u32,
    },
    Remove {
        id: NodeId,
        max_removals: u32,
    },
    ReclaimDeposit {
        id: NodeId,
        max_removals: u32,
    },
    RevokeAttestation {
        claim_hash: String,
        submitter: AccountId,
        max_parent_checks: u32,
    },
}

impl DelegationTx {
    pub fn kind(&self) -> TxKind {
        match self {
            Self::StoreRoot(_) => TxKind::StoreRoot,
            Self::StoreDelegation { .. } => TxKind::StoreDelegation,
            Self::Revoke { .. } => TxKind::Revoke,
            Self::Remove { .. } => TxKind::Remove,
            Self::ReclaimDeposit { .. } => TxKind::ReclaimDeposit,
            Self::RevokeAttestation { .. } => TxKind::RevokeAttestation,
        }
    }

    /// Submit the request. Ledger errors are returned unchanged.
    pub async fn submit<L>(&self, ledger: &L) -> Result<PendingTx>
    where
        L: LedgerGateway + ?Sized,
    {
        let pending = match self {
            Self::StoreRoot(root) => ledger.submit_store_root(root).await?,
            Self::StoreDelegation { node, signature } => {
                ledger.submit_store_delegation(node, signature).await?
            }
            Self::Revoke {
                id,
                submitter,
                max_parent_checks,
                max_revocations,
            } => {
                ledger
                    .submit_revoke(id, submitter, *max_parent_checks, *max_revocations)
                    .await?
            }
            Self::Remove { id, max_removals } => ledger.submit_remove(id, *max_removals).await?,
            Self::ReclaimDeposit { id, max_removals } => {
                ledger.submit_reclaim_deposit(id, *max_removals).await?
            }
            Self::RevokeAttestation {
                claim_hash,
                submitter,
                max_parent_checks,
            } => {
                ledger
                    .submit_revoke_attestation(claim_hash, submitter, *max_parent_checks)
                    .await?
            }
        };
        debug!("submitted {} as {}", pending.kind.as_str(), pending.tx_hash);
        Ok(pending)
    }
}
