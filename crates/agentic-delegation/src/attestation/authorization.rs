//! Authorization distance for attestation revocation.
//!
//! An attestation may be revoked by its owner, or by anyone owning the
//! delegation node it was issued under or one of that node's ancestors.
//! The distance computed here is sent as `max_parent_checks` so the ledger
//! can re-verify the same chain.

use log::debug;

use crate::config::TraversalConfig;
use crate::error::{DelegationError, Result};
use crate::hierarchy::{DelegationNode, TreeNavigator};
use crate::identity::AccountId;
use crate::ledger::LedgerGateway;

use super::Attestation;

/// Decides whether an account may act on an attestation.
pub struct AuthorizationChecker<'a, L: ?Sized> {
    navigator: TreeNavigator<'a, L>,
    ledger: &'a L,
}

impl<'a, L> AuthorizationChecker<'a, L>
where
    L: LedgerGateway + ?Sized,
{
    pub fn new(ledger: &'a L) -> Self {
        Self {
            navigator: TreeNavigator::new(ledger),
            ledger,
        }
    }

    pub fn with_config(ledger: &'a L, config: TraversalConfig) -> Result<Self> {
        Ok(Self {
            navigator: TreeNavigator::with_config(ledger, config)?,
            ledger,
        })
    }

    /// Number of checks the ledger needs to confirm `acting_account` may
    /// revoke `attestation`.
    ///
    /// The owner needs none. Otherwise the count is one for the edge from
    /// the attestation to its delegation node plus the hops from that node
    /// to the closest node `acting_account` owns.
    pub async fn count_node_depth(
        &self,
        acting_account: &AccountId,
        attestation: &Attestation,
    ) -> Result<u32> {
        attestation.validate()?;
        acting_account.validate()?;

        if attestation.owner == *acting_account {
            return Ok(0);
        }

        let delegation_id = attestation.delegation_id.as_ref().ok_or_else(|| {
            DelegationError::Unauthorized(format!(
                "{acting_account} does not own attestation {} and it has no delegation",
                attestation.claim_hash
            ))
        })?;

        let node = DelegationNode::fetch(self.ledger, delegation_id)
            .await?
            .ok_or_else(|| DelegationError::NodeNotFound(delegation_id.0.clone()))?;

        let search = self
            .navigator
            .find_ancestor_owned_by(&node, acting_account)
            .await?;
        if !search.is_found() {
            return Err(DelegationError::Unauthorized(format!(
                "{acting_account} owns no node above attestation {}",
                attestation.claim_hash
            )));
        }

        let depth = search.steps + 1;
        debug!(
            "{acting_account} may revoke {} with {depth} parent checks",
            attestation.claim_hash
        );
        Ok(depth)
    }
}
