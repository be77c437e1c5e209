//! In-memory ledger backend.
//!
//! Reference implementation of [`LedgerGateway`] that applies the same
//! rules a delegation ledger enforces: deposits are charged to the
//! submitting account, delegations need their parent owner's submission
//! and the delegate's signature, revocation cascades atomically within the
//! requested bound, and only the deposit payer may remove a node.
//!
//! Clones share state. [`MemoryLedger::as_submitter`] gives a handle that
//! signs transactions as a different account.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::attestation::Attestation;
use crate::config::LedgerConfig;
use crate::crypto::DelegateSignature;
use crate::error::Result;
use crate::hierarchy::{
    CTypeHash, DelegatedNode, DelegationNode, HierarchyRoot, NodeId, Permission,
};
use crate::identity::AccountId;

use super::{HierarchyDetails, LedgerError, LedgerGateway, PendingTx, TxKind};

/// Code used for structurally invalid submissions.
const REJECT_MALFORMED: u32 = 1;
/// Code used when a delegation's parent sits in another hierarchy.
const REJECT_HIERARCHY_MISMATCH: u32 = 2;

#[derive(Debug, Clone)]
struct StoredNode {
    node: DelegationNode,
    deposit_payer: AccountId,
    deposit: u128,
}

#[derive(Debug, Default)]
struct LedgerState {
    nodes: HashMap<NodeId, StoredNode>,
    hierarchies: HashMap<NodeId, CTypeHash>,
    attestations: HashMap<String, Attestation>,
    tx_counter: u64,
}

impl LedgerState {
    fn node(&self, id: &NodeId) -> std::result::Result<&StoredNode, LedgerError> {
        self.nodes
            .get(id)
            .ok_or_else(|| LedgerError::DelegationNotFound(id.0.clone()))
    }

    fn insert(&mut self, node: DelegationNode, deposit_payer: AccountId, deposit: u128) {
        if let Some(parent_id) = node.effective_parent_id() {
            if let Some(parent) = self.nodes.get_mut(parent_id) {
                children_mut(&mut parent.node).insert(node.id().clone());
            }
        }
        if let DelegationNode::Root(root) = &node {
            self.hierarchies
                .insert(root.id.clone(), root.ctype_hash.clone());
        }
        self.nodes.insert(
            node.id().clone(),
            StoredNode {
                node,
                deposit_payer,
                deposit,
            },
        );
    }

    /// Whether `who` owns `start` or an ancestor within `max_parent_checks` hops.
    fn is_delegating(
        &self,
        who: &AccountId,
        start: &NodeId,
        max_parent_checks: u32,
    ) -> std::result::Result<bool, LedgerError> {
        let mut current = self.node(start)?;
        let mut remaining = max_parent_checks;
        loop {
            if current.node.account() == who {
                return Ok(true);
            }
            let Some(parent_id) = current.node.effective_parent_id() else {
                return Ok(false);
            };
            if remaining == 0 {
                return Err(LedgerError::ExceededParentChecks);
            }
            remaining -= 1;
            current = self.node(parent_id)?;
        }
    }

    /// Descendants of `id` in depth-first pre-order.
    fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending: Vec<NodeId> = self
            .nodes
            .get(id)
            .map(|stored| stored.node.children_ids().iter().cloned().collect())
            .unwrap_or_default();
        while let Some(next) = pending.pop() {
            if let Some(stored) = self.nodes.get(&next) {
                pending.extend(stored.node.children_ids().iter().cloned());
            }
            out.push(next);
        }
        out
    }

    fn next_tx(&mut self, kind: TxKind) -> PendingTx {
        self.tx_counter += 1;
        let digest = Sha256::digest(format!("{}:{}", kind.as_str(), self.tx_counter).as_bytes());
        PendingTx {
            tx_hash: format!("0x{}", hex::encode(digest)),
            kind,
        }
    }
}

fn children_mut(node: &mut DelegationNode) -> &mut BTreeSet<NodeId> {
    match node {
        DelegationNode::Root(root) => &mut root.children_ids,
        DelegationNode::Delegated(node) => &mut node.children_ids,
    }
}

fn mark_revoked(node: &mut DelegationNode) {
    match node {
        DelegationNode::Root(root) => root.revoked = true,
        DelegationNode::Delegated(node) => node.revoked = true,
    }
}

fn malformed(e: crate::error::DelegationError) -> LedgerError {
    LedgerError::Rejected {
        code: REJECT_MALFORMED,
        message: e.to_string(),
    }
}

/// Shared, in-process delegation ledger.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    state: Arc<RwLock<LedgerState>>,
    submitter: AccountId,
    config: LedgerConfig,
}

impl MemoryLedger {
    /// Create an empty ledger whose transactions are signed by `submitter`.
    pub fn new(submitter: AccountId) -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState::default())),
            submitter,
            config: LedgerConfig::default(),
        }
    }

    pub fn with_config(submitter: AccountId, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Arc::new(RwLock::new(LedgerState::default())),
            submitter,
            config,
        })
    }

    /// A handle onto the same state that submits as `submitter`.
    pub fn as_submitter(&self, submitter: AccountId) -> Self {
        Self {
            state: Arc::clone(&self.state),
            submitter,
            config: self.config.clone(),
        }
    }

    pub fn submitter(&self) -> &AccountId {
        &self.submitter
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Fixtures ──────────────────────────────────────────────────────────────

    /// Insert a root directly, skipping submission checks.
    pub fn seed_root(&self, root: HierarchyRoot) -> std::result::Result<(), LedgerError> {
        let mut state = self.write();
        if state.nodes.contains_key(&root.id) {
            return Err(LedgerError::AlreadyExists(root.id.0));
        }
        let deposit = self.config.deposit;
        state.insert(root.into(), self.submitter.clone(), deposit);
        Ok(())
    }

    /// Insert a delegation directly, skipping signature and permission checks.
    pub fn seed_delegation(&self, node: DelegatedNode) -> std::result::Result<(), LedgerError> {
        let mut state = self.write();
        if state.nodes.contains_key(&node.id) {
            return Err(LedgerError::AlreadyExists(node.id.0));
        }
        state.node(node.effective_parent_id())?;
        let deposit = self.config.deposit;
        state.insert(node.into(), self.submitter.clone(), deposit);
        Ok(())
    }

    /// Drop a node record while leaving references to it in place.
    pub fn forget_node(&self, id: &NodeId) -> bool {
        self.write().nodes.remove(id).is_some()
    }

    /// Record an issued attestation.
    pub fn insert_attestation(&self, attestation: Attestation) -> std::result::Result<(), LedgerError> {
        attestation.validate().map_err(malformed)?;
        let mut state = self.write();
        if state.attestations.contains_key(&attestation.claim_hash) {
            return Err(LedgerError::AlreadyExists(attestation.claim_hash));
        }
        state
            .attestations
            .insert(attestation.claim_hash.clone(), attestation);
        Ok(())
    }

    pub fn attestation(&self, claim_hash: &str) -> Option<Attestation> {
        self.read().attestations.get(claim_hash).cloned()
    }

    /// Total deposit currently reserved from `payer`.
    pub fn reserved_deposit(&self, payer: &AccountId) -> u128 {
        self.read()
            .nodes
            .values()
            .filter(|stored| &stored.deposit_payer == payer)
            .map(|stored| stored.deposit)
            .sum()
    }

    pub fn node_count(&self) -> usize {
        self.read().nodes.len()
    }

    fn remove_subtree(
        &self,
        id: &NodeId,
        max_removals: u32,
        kind: TxKind,
    ) -> std::result::Result<PendingTx, LedgerError> {
        let mut state = self.write();
        let stored = state.node(id)?;
        if stored.deposit_payer != self.submitter {
            return Err(LedgerError::UnauthorizedRemoval);
        }
        if max_removals > self.config.max_removals {
            return Err(LedgerError::ExceededRemovalBounds);
        }
        let parent_id = stored.node.effective_parent_id().cloned();
        let descendants = state.descendants(id);
        if descendants.len() > max_removals as usize {
            return Err(LedgerError::ExceededRemovalBounds);
        }

        for descendant in &descendants {
            state.nodes.remove(descendant);
            state.hierarchies.remove(descendant);
        }
        state.nodes.remove(id);
        state.hierarchies.remove(id);
        if let Some(parent_id) = parent_id {
            if let Some(parent) = state.nodes.get_mut(&parent_id) {
                children_mut(&mut parent.node).remove(id);
            }
        }

        info!(
            "removed {} and {} descendants on behalf of {}",
            id,
            descendants.len(),
            self.submitter
        );
        Ok(state.next_tx(kind))
    }
}

#[async_trait]
impl LedgerGateway for MemoryLedger {
    async fn query(&self, id: &NodeId) -> std::result::Result<Option<DelegationNode>, LedgerError> {
        Ok(self.read().nodes.get(id).map(|stored| stored.node.clone()))
    }

    async fn get_children(&self, id: &NodeId) -> std::result::Result<BTreeSet<NodeId>, LedgerError> {
        Ok(self
            .read()
            .nodes
            .get(id)
            .map(|stored| stored.node.children_ids().clone())
            .unwrap_or_default())
    }

    async fn get_attestation_hashes(
        &self,
        id: &NodeId,
    ) -> std::result::Result<Vec<String>, LedgerError> {
        let state = self.read();
        let mut hashes: Vec<String> = state
            .attestations
            .values()
            .filter(|attestation| attestation.delegation_id.as_ref() == Some(id))
            .map(|attestation| attestation.claim_hash.clone())
            .collect();
        hashes.sort();
        Ok(hashes)
    }

    async fn get_hierarchy_details(
        &self,
        root_id: &NodeId,
    ) -> std::result::Result<Option<HierarchyDetails>, LedgerError> {
        Ok(self
            .read()
            .hierarchies
            .get(root_id)
            .map(|ctype_hash| HierarchyDetails {
                root_id: root_id.clone(),
                ctype_hash: ctype_hash.clone(),
            }))
    }

    async fn submit_store_root(
        &self,
        root: &HierarchyRoot,
    ) -> std::result::Result<PendingTx, LedgerError> {
        root.validate().map_err(malformed)?;
        let mut state = self.write();
        if state.nodes.contains_key(&root.id) || state.hierarchies.contains_key(&root.id) {
            return Err(LedgerError::AlreadyExists(root.id.0.clone()));
        }

        let mut fresh = root.clone();
        fresh.children_ids.clear();
        fresh.revoked = false;
        state.insert(fresh.into(), self.submitter.clone(), self.config.deposit);

        debug!("stored hierarchy root {} paid by {}", root.id, self.submitter);
        Ok(state.next_tx(TxKind::StoreRoot))
    }

    async fn submit_store_delegation(
        &self,
        node: &DelegatedNode,
        delegate_signature: &DelegateSignature,
    ) -> std::result::Result<PendingTx, LedgerError> {
        node.validate().map_err(malformed)?;
        let mut state = self.write();
        if state.nodes.contains_key(&node.id) {
            return Err(LedgerError::AlreadyExists(node.id.0.clone()));
        }
        if !state.hierarchies.contains_key(&node.hierarchy_id) {
            return Err(LedgerError::HierarchyNotFound(node.hierarchy_id.0.clone()));
        }

        let parent = &state.node(node.effective_parent_id())?.node;
        if parent.hierarchy_id() != &node.hierarchy_id {
            return Err(LedgerError::Rejected {
                code: REJECT_HIERARCHY_MISMATCH,
                message: format!("parent {} belongs to another hierarchy", parent.id()),
            });
        }
        if parent.is_revoked() {
            return Err(LedgerError::ParentRevoked);
        }
        if !parent.has_permission(Permission::Delegate) {
            return Err(LedgerError::MissingDelegatePermission);
        }
        if parent.account() != &self.submitter {
            return Err(LedgerError::UnauthorizedDelegation);
        }
        node.verify_delegate_signature(delegate_signature)
            .map_err(|_| LedgerError::InvalidDelegateSignature)?;

        let mut fresh = node.clone();
        fresh.children_ids.clear();
        fresh.revoked = false;
        state.insert(fresh.into(), self.submitter.clone(), self.config.deposit);

        debug!(
            "stored delegation {} under {} for {}",
            node.id,
            node.effective_parent_id(),
            node.account
        );
        Ok(state.next_tx(TxKind::StoreDelegation))
    }

    async fn submit_revoke(
        &self,
        id: &NodeId,
        submitter: &AccountId,
        max_parent_checks: u32,
        max_revocations: u32,
    ) -> std::result::Result<PendingTx, LedgerError> {
        if submitter != &self.submitter {
            return Err(LedgerError::UnauthorizedRevocation);
        }
        if max_parent_checks > self.config.max_parent_checks {
            return Err(LedgerError::ExceededParentChecks);
        }
        if max_revocations > self.config.max_revocations {
            return Err(LedgerError::ExceededRevocationBounds);
        }

        let mut state = self.write();
        if !state.is_delegating(submitter, id, max_parent_checks)? {
            return Err(LedgerError::UnauthorizedRevocation);
        }

        // Descendants before their ancestors; whatever the budget does not reach stays live.
        let mut budget = max_revocations;
        let mut skipped = 0usize;
        let descendants = state.descendants(id);
        for descendant in descendants.into_iter().rev() {
            let Some(stored) = state.nodes.get_mut(&descendant) else {
                continue;
            };
            if stored.node.is_revoked() {
                continue;
            }
            if budget == 0 {
                skipped += 1;
                continue;
            }
            mark_revoked(&mut stored.node);
            budget -= 1;
        }
        if let Some(stored) = state.nodes.get_mut(id) {
            mark_revoked(&mut stored.node);
        }

        if skipped > 0 {
            info!("revoked {id}; {skipped} descendants left unrevoked by max_revocations={max_revocations}");
        } else {
            debug!("revoked {id} and its subtree");
        }
        Ok(state.next_tx(TxKind::Revoke))
    }

    async fn submit_remove(
        &self,
        id: &NodeId,
        max_removals: u32,
    ) -> std::result::Result<PendingTx, LedgerError> {
        self.remove_subtree(id, max_removals, TxKind::Remove)
    }

    async fn submit_reclaim_deposit(
        &self,
        id: &NodeId,
        max_removals: u32,
    ) -> std::result::Result<PendingTx, LedgerError> {
        self.remove_subtree(id, max_removals, TxKind::ReclaimDeposit)
    }

    async fn submit_revoke_attestation(
        &self,
        claim_hash: &str,
        submitter: &AccountId,
        max_parent_checks: u32,
    ) -> std::result::Result<PendingTx, LedgerError> {
        if submitter != &self.submitter {
            return Err(LedgerError::UnauthorizedRevocation);
        }
        if max_parent_checks > self.config.max_parent_checks {
            return Err(LedgerError::ExceededParentChecks);
        }

        let mut state = self.write();
        let attestation = state
            .attestations
            .get(claim_hash)
            .ok_or_else(|| LedgerError::AttestationNotFound(claim_hash.to_string()))?;

        if &attestation.owner != submitter {
            let delegation_id = attestation
                .delegation_id
                .clone()
                .ok_or(LedgerError::UnauthorizedRevocation)?;
            // The first check is the edge from the attestation to its node.
            let hops = max_parent_checks
                .checked_sub(1)
                .ok_or(LedgerError::ExceededParentChecks)?;
            if !state.is_delegating(submitter, &delegation_id, hops)? {
                return Err(LedgerError::UnauthorizedRevocation);
            }
        }

        if let Some(attestation) = state.attestations.get_mut(claim_hash) {
            attestation.revoked = true;
        }
        debug!("revoked attestation {claim_hash}");
        Ok(state.next_tx(TxKind::RevokeAttestation))
    }

    async fn query_deposit_amount(&self) -> std::result::Result<u128, LedgerError> {
        Ok(self.config.deposit)
    }
}
