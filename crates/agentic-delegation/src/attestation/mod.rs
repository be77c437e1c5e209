//! Attestations issued under a hierarchy, and who may revoke them.
//!
//! Issuance itself happens elsewhere; this module only models the stored
//! attestation record and computes the authorization distance a non-owner
//! needs to revoke one.

pub mod authorization;

pub use authorization::AuthorizationChecker;

use serde::{Deserialize, Serialize};

use crate::error::{DelegationError, Result};
use crate::hierarchy::id::is_hex_hash;
use crate::hierarchy::{CTypeHash, DelegationTx, NodeId};
use crate::identity::AccountId;
use crate::ledger::LedgerGateway;

/// A stored attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// Hash of the attested claim; the attestation's key on the ledger.
    pub claim_hash: String,
    pub ctype_hash: CTypeHash,
    /// Account that issued the attestation.
    pub owner: AccountId,
    /// Delegation node the attestation was issued under, if any.
    #[serde(default)]
    pub delegation_id: Option<NodeId>,
    #[serde(default)]
    pub revoked: bool,
}

impl Attestation {
    pub fn new(
        claim_hash: impl Into<String>,
        ctype_hash: CTypeHash,
        owner: AccountId,
        delegation_id: Option<NodeId>,
    ) -> Self {
        Self {
            claim_hash: claim_hash.into(),
            ctype_hash,
            owner,
            delegation_id,
            revoked: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !is_hex_hash(&self.claim_hash) {
            return Err(DelegationError::InvalidClaimHash(self.claim_hash.clone()));
        }
        if !self.ctype_hash.is_well_formed() {
            return Err(DelegationError::InvalidCTypeHash(self.ctype_hash.0.clone()));
        }
        self.owner.validate()?;
        if let Some(id) = &self.delegation_id {
            if !id.is_well_formed() {
                return Err(DelegationError::InvalidId(id.0.clone()));
            }
        }
        Ok(())
    }

    /// Build a revoke request on behalf of `acting_account`.
    pub async fn revoke_tx<L>(&self, ledger: &L, acting_account: &AccountId) -> Result<DelegationTx>
    where
        L: LedgerGateway + ?Sized,
    {
        let max_parent_checks = AuthorizationChecker::new(ledger)
            .count_node_depth(acting_account, self)
            .await?;
        Ok(DelegationTx::RevokeAttestation {
            claim_hash: self.claim_hash.clone(),
            submitter: acting_account.clone(),
            max_parent_checks,
        })
    }
}
