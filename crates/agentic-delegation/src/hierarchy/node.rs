//! Delegation nodes: the values that make up a hierarchy.
//!
//! A hierarchy has exactly one [`HierarchyRoot`], scoped to a ctype hash,
//! and any number of [`DelegatedNode`]s below it. [`DelegationNode`] is
//! the sum of the two and carries the shared read behavior plus every
//! ledger-facing operation.
//!
//! Values are built locally and are not canonical until stored through a
//! [`LedgerGateway`]. Every operation validates the node before touching
//! the ledger.

use std::collections::BTreeSet;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crypto::{DelegateSignature, Signer};
use crate::error::{DelegationError, Result};
use crate::identity::AccountId;
use crate::ledger::{HierarchyDetails, LedgerGateway};

use super::hash::{generate_hash, generate_hash_bytes};
use super::id::{normalize_hex_hash, CTypeHash, NodeId};
use super::navigator::{AncestorSearch, TreeNavigator};
use super::permission::{Permission, Permissions};
use super::tx::DelegationTx;

/// The root of a hierarchy. Its id doubles as the hierarchy id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyRoot {
    pub id: NodeId,
    /// Claim schema the whole hierarchy is scoped to.
    pub ctype_hash: CTypeHash,
    pub account: AccountId,
    pub permissions: Permissions,
    #[serde(default)]
    pub children_ids: BTreeSet<NodeId>,
    #[serde(default)]
    pub revoked: bool,
}

impl HierarchyRoot {
    /// Create a new, not yet stored root with a fresh id and all permissions.
    pub fn new(ctype_hash: CTypeHash, account: AccountId) -> Self {
        Self::with_id(NodeId::random(), ctype_hash, account)
    }

    pub fn with_id(id: NodeId, ctype_hash: CTypeHash, account: AccountId) -> Self {
        Self {
            id,
            ctype_hash,
            account,
            permissions: Permissions::all(),
            children_ids: BTreeSet::new(),
            revoked: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.id.is_well_formed() {
            return Err(DelegationError::InvalidId(self.id.0.clone()));
        }
        if !self.ctype_hash.is_well_formed() {
            return Err(DelegationError::InvalidCTypeHash(self.ctype_hash.0.clone()));
        }
        self.account.validate()?;
        self.permissions.validate()
    }

    pub fn generate_hash(&self) -> Result<String> {
        generate_hash(&self.id, &self.id, None, self.permissions)
    }

    pub fn details(&self) -> HierarchyDetails {
        HierarchyDetails {
            root_id: self.id.clone(),
            ctype_hash: self.ctype_hash.clone(),
        }
    }

    /// Build the request that creates this hierarchy on the ledger.
    pub fn store_tx(&self) -> Result<DelegationTx> {
        self.validate()?;
        if self.revoked {
            return Err(DelegationError::InvalidRecord(
                "a new root cannot be revoked".into(),
            ));
        }
        debug!("building store-root request for {}", self.id);
        Ok(DelegationTx::StoreRoot(self.clone()))
    }

    /// Fetch a root by id. A non-root id is `NotRoot`; an unknown id is `None`.
    pub async fn fetch<L>(ledger: &L, id: &NodeId) -> Result<Option<Self>>
    where
        L: LedgerGateway + ?Sized,
    {
        ensure_id(id)?;
        match ledger.query(id).await? {
            Some(DelegationNode::Root(root)) => Ok(Some(root)),
            Some(DelegationNode::Delegated(node)) => Err(DelegationError::NotRoot(node.id.0)),
            None => Ok(None),
        }
    }
}

/// A node below the root, holding rights delegated by its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedNode {
    pub id: NodeId,
    pub hierarchy_id: NodeId,
    /// Explicit parent; `None` means the hierarchy root.
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    pub account: AccountId,
    pub permissions: Permissions,
    #[serde(default)]
    pub children_ids: BTreeSet<NodeId>,
    #[serde(default)]
    pub revoked: bool,
}

impl DelegatedNode {
    /// Create a new, not yet stored delegation with a fresh id.
    pub fn new(
        hierarchy_id: NodeId,
        parent_id: Option<NodeId>,
        account: AccountId,
        permissions: Permissions,
    ) -> Self {
        Self::with_id(NodeId::random(), hierarchy_id, parent_id, account, permissions)
    }

    pub fn with_id(
        id: NodeId,
        hierarchy_id: NodeId,
        parent_id: Option<NodeId>,
        account: AccountId,
        permissions: Permissions,
    ) -> Self {
        Self {
            id,
            hierarchy_id,
            parent_id,
            account,
            permissions,
            children_ids: BTreeSet::new(),
            revoked: false,
        }
    }

    /// The parent this node hangs off: `parent_id`, else the root.
    pub fn effective_parent_id(&self) -> &NodeId {
        self.parent_id.as_ref().unwrap_or(&self.hierarchy_id)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.id.is_well_formed() {
            return Err(DelegationError::InvalidId(self.id.0.clone()));
        }
        if !self.hierarchy_id.is_well_formed() {
            return Err(DelegationError::InvalidHierarchyId(self.hierarchy_id.0.clone()));
        }
        let id_bytes = self.id.to_bytes();
        if id_bytes == self.hierarchy_id.to_bytes() {
            return Err(DelegationError::NotDelegated(self.id.0.clone()));
        }
        if let Some(parent) = &self.parent_id {
            if !parent.is_well_formed() || parent.to_bytes() == id_bytes {
                return Err(DelegationError::InvalidParentId(parent.0.clone()));
            }
        }
        self.account.validate()?;
        self.permissions.validate()
    }

    pub fn generate_hash(&self) -> Result<String> {
        generate_hash(
            &self.id,
            &self.hierarchy_id,
            self.parent_id.as_ref(),
            self.permissions,
        )
    }

    /// Ask the delegate to sign this node's integrity hash.
    pub fn delegee_sign<S>(&self, signer: &S) -> Result<DelegateSignature>
    where
        S: Signer + ?Sized,
    {
        self.validate()?;
        let digest = generate_hash_bytes(
            &self.id,
            &self.hierarchy_id,
            self.parent_id.as_ref(),
            self.permissions,
        )?;
        signer.sign(&digest)
    }

    /// Check a delegate signature covers this exact node and comes from its account.
    pub fn verify_delegate_signature(&self, signature: &DelegateSignature) -> Result<()> {
        if signature.signer != self.account {
            return Err(DelegationError::SignatureMismatch(format!(
                "signed by {}, node belongs to {}",
                signature.signer, self.account
            )));
        }
        let digest = generate_hash_bytes(
            &self.id,
            &self.hierarchy_id,
            self.parent_id.as_ref(),
            self.permissions,
        )?;
        signature.verify(&digest)
    }

    /// Build the request that stores this delegation on the ledger.
    pub fn store_tx(&self, signature: DelegateSignature) -> Result<DelegationTx> {
        self.validate()?;
        if self.revoked {
            return Err(DelegationError::InvalidRecord(
                "a new delegation cannot be revoked".into(),
            ));
        }
        self.verify_delegate_signature(&signature)?;
        debug!(
            "building store-delegation request for {} under {}",
            self.id,
            self.effective_parent_id()
        );
        Ok(DelegationTx::StoreDelegation {
            node: self.clone(),
            signature,
        })
    }
}

/// Any node of a hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DelegationNode {
    Root(HierarchyRoot),
    Delegated(DelegatedNode),
}

impl From<HierarchyRoot> for DelegationNode {
    fn from(root: HierarchyRoot) -> Self {
        Self::Root(root)
    }
}

impl From<DelegatedNode> for DelegationNode {
    fn from(node: DelegatedNode) -> Self {
        Self::Delegated(node)
    }
}

impl DelegationNode {
    // ── Shared read behavior ──────────────────────────────────────────────────

    pub fn id(&self) -> &NodeId {
        match self {
            Self::Root(root) => &root.id,
            Self::Delegated(node) => &node.id,
        }
    }

    pub fn hierarchy_id(&self) -> &NodeId {
        match self {
            Self::Root(root) => &root.id,
            Self::Delegated(node) => &node.hierarchy_id,
        }
    }

    /// The explicitly recorded parent, if any.
    pub fn parent_id(&self) -> Option<&NodeId> {
        match self {
            Self::Root(_) => None,
            Self::Delegated(node) => node.parent_id.as_ref(),
        }
    }

    /// The node's actual parent; `None` only for the root.
    pub fn effective_parent_id(&self) -> Option<&NodeId> {
        match self {
            Self::Root(_) => None,
            Self::Delegated(node) => Some(node.effective_parent_id()),
        }
    }

    pub fn account(&self) -> &AccountId {
        match self {
            Self::Root(root) => &root.account,
            Self::Delegated(node) => &node.account,
        }
    }

    pub fn permissions(&self) -> Permissions {
        match self {
            Self::Root(root) => root.permissions,
            Self::Delegated(node) => node.permissions,
        }
    }

    pub fn children_ids(&self) -> &BTreeSet<NodeId> {
        match self {
            Self::Root(root) => &root.children_ids,
            Self::Delegated(node) => &node.children_ids,
        }
    }

    pub fn is_revoked(&self) -> bool {
        match self {
            Self::Root(root) => root.revoked,
            Self::Delegated(node) => node.revoked,
        }
    }

    pub fn is_root(&self) -> bool {
        self.id() == self.hierarchy_id()
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(permission)
    }

    pub fn as_root(&self) -> Option<&HierarchyRoot> {
        match self {
            Self::Root(root) => Some(root),
            Self::Delegated(_) => None,
        }
    }

    pub fn as_delegated(&self) -> Option<&DelegatedNode> {
        match self {
            Self::Root(_) => None,
            Self::Delegated(node) => Some(node),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Root(root) => root.validate(),
            Self::Delegated(node) => node.validate(),
        }
    }

    pub fn generate_hash(&self) -> Result<String> {
        match self {
            Self::Root(root) => root.generate_hash(),
            Self::Delegated(node) => node.generate_hash(),
        }
    }

    // ── Request builders ──────────────────────────────────────────────────────

    /// Have `signer` sign this node's integrity hash.
    pub fn delegee_sign<S>(&self, signer: &S) -> Result<DelegateSignature>
    where
        S: Signer + ?Sized,
    {
        match self {
            Self::Root(root) => Err(DelegationError::NotDelegated(root.id.0.clone())),
            Self::Delegated(node) => node.delegee_sign(signer),
        }
    }

    /// Store request for a root; fails on a delegated node.
    pub fn store_root_tx(&self) -> Result<DelegationTx> {
        match self {
            Self::Root(root) => root.store_tx(),
            Self::Delegated(node) => Err(DelegationError::NotRoot(node.id.0.clone())),
        }
    }

    /// Store request for a delegation; fails on a root.
    pub fn store_delegation_tx(&self, signature: DelegateSignature) -> Result<DelegationTx> {
        match self {
            Self::Root(root) => Err(DelegationError::NotDelegated(root.id.0.clone())),
            Self::Delegated(node) => node.store_tx(signature),
        }
    }

    /// Store request for either variant; delegations need the delegate's signature.
    pub fn store_tx(&self, signature: Option<DelegateSignature>) -> Result<DelegationTx> {
        match (self, signature) {
            (Self::Root(root), _) => root.store_tx(),
            (Self::Delegated(node), Some(signature)) => node.store_tx(signature),
            (Self::Delegated(node), None) => Err(DelegationError::SignatureMismatch(format!(
                "delegation {} requires a delegate signature",
                node.id
            ))),
        }
    }

    /// Build a revoke request on behalf of `submitter`.
    ///
    /// `max_parent_checks` is the distance from this node to the closest
    /// node owned by `submitter`; `max_revocations` is the subtree size.
    pub async fn revoke_tx<L>(&self, ledger: &L, submitter: &AccountId) -> Result<DelegationTx>
    where
        L: LedgerGateway + ?Sized,
    {
        self.validate()?;
        submitter.validate()?;

        let navigator = TreeNavigator::new(ledger);
        let search = navigator.find_ancestor_owned_by(self, submitter).await?;
        if !search.is_found() {
            return Err(DelegationError::Unauthorized(format!(
                "{submitter} owns neither {} nor any of its ancestors",
                self.id()
            )));
        }
        let max_revocations = navigator.subtree_node_count(self).await?;

        debug!(
            "revoke request for {}: max_parent_checks={}, max_revocations={}",
            self.id(),
            search.steps,
            max_revocations
        );
        Ok(DelegationTx::Revoke {
            id: self.id().clone(),
            submitter: submitter.clone(),
            max_parent_checks: search.steps,
            max_revocations,
        })
    }

    /// Build a removal request covering this node's whole subtree.
    pub async fn remove_tx<L>(&self, ledger: &L) -> Result<DelegationTx>
    where
        L: LedgerGateway + ?Sized,
    {
        self.validate()?;
        let max_removals = TreeNavigator::new(ledger).subtree_node_count(self).await?;
        debug!("remove request for {}: max_removals={max_removals}", self.id());
        Ok(DelegationTx::Remove {
            id: self.id().clone(),
            max_removals,
        })
    }

    /// Build a deposit-reclaim request covering this node's whole subtree.
    pub async fn reclaim_deposit_tx<L>(&self, ledger: &L) -> Result<DelegationTx>
    where
        L: LedgerGateway + ?Sized,
    {
        self.validate()?;
        let max_removals = TreeNavigator::new(ledger).subtree_node_count(self).await?;
        debug!(
            "reclaim-deposit request for {}: max_removals={max_removals}",
            self.id()
        );
        Ok(DelegationTx::ReclaimDeposit {
            id: self.id().clone(),
            max_removals,
        })
    }

    // ── Ledger reads ──────────────────────────────────────────────────────────

    /// Fetch a node by id. Unknown ids are `None`.
    pub async fn fetch<L>(ledger: &L, id: &NodeId) -> Result<Option<Self>>
    where
        L: LedgerGateway + ?Sized,
    {
        ensure_id(id)?;
        Ok(ledger.query(id).await?)
    }

    /// True iff the node is stored on the ledger and not revoked.
    pub async fn verify<L>(&self, ledger: &L) -> Result<bool>
    where
        L: LedgerGateway + ?Sized,
    {
        ensure_id(self.id())?;
        let stored = ledger.query(self.id()).await?;
        Ok(stored.is_some_and(|node| !node.is_revoked()))
    }

    /// Resolve the node's children through the ledger.
    pub async fn get_children<L>(&self, ledger: &L) -> Result<Vec<DelegationNode>>
    where
        L: LedgerGateway + ?Sized,
    {
        ensure_id(self.id())?;
        TreeNavigator::new(ledger).children_of(self).await
    }

    /// Fetch the parent node; the root has none.
    pub async fn get_parent<L>(&self, ledger: &L) -> Result<Option<DelegationNode>>
    where
        L: LedgerGateway + ?Sized,
    {
        self.validate()?;
        TreeNavigator::new(ledger).parent_of(self).await
    }

    pub async fn get_hierarchy_details<L>(&self, ledger: &L) -> Result<HierarchyDetails>
    where
        L: LedgerGateway + ?Sized,
    {
        let hierarchy_id = self.hierarchy_id();
        if !hierarchy_id.is_well_formed() {
            return Err(DelegationError::InvalidHierarchyId(hierarchy_id.0.clone()));
        }
        ledger
            .get_hierarchy_details(hierarchy_id)
            .await?
            .ok_or_else(|| DelegationError::HierarchyNotFound(hierarchy_id.0.clone()))
    }

    pub async fn get_root<L>(&self, ledger: &L) -> Result<HierarchyRoot>
    where
        L: LedgerGateway + ?Sized,
    {
        let hierarchy_id = self.hierarchy_id();
        if !hierarchy_id.is_well_formed() {
            return Err(DelegationError::InvalidHierarchyId(hierarchy_id.0.clone()));
        }
        HierarchyRoot::fetch(ledger, hierarchy_id)
            .await?
            .ok_or_else(|| DelegationError::HierarchyNotFound(hierarchy_id.0.clone()))
    }

    /// Claim hashes of attestations issued under this node.
    pub async fn get_attestation_hashes<L>(&self, ledger: &L) -> Result<Vec<String>>
    where
        L: LedgerGateway + ?Sized,
    {
        ensure_id(self.id())?;
        Ok(ledger.get_attestation_hashes(self.id()).await?)
    }

    pub async fn subtree_node_count<L>(&self, ledger: &L) -> Result<u32>
    where
        L: LedgerGateway + ?Sized,
    {
        self.validate()?;
        TreeNavigator::new(ledger).subtree_node_count(self).await
    }

    pub async fn find_ancestor_owned_by<L>(
        &self,
        ledger: &L,
        account: &AccountId,
    ) -> Result<AncestorSearch>
    where
        L: LedgerGateway + ?Sized,
    {
        self.validate()?;
        TreeNavigator::new(ledger)
            .find_ancestor_owned_by(self, account)
            .await
    }

    // ── Untyped records ───────────────────────────────────────────────────────

    /// Decode and validate an untyped JSON node record.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Decode and validate an untyped node record.
    ///
    /// A record whose `id` equals its `hierarchy_id` is a root and must
    /// carry `ctype_hash`; anything else is a delegation.
    pub fn from_value(value: &Value) -> Result<Self> {
        let record = value
            .as_object()
            .ok_or_else(|| DelegationError::InvalidRecord("expected a JSON object".into()))?;

        let id = hex_field(record, "id", DelegationError::InvalidId)?
            .ok_or_else(|| DelegationError::InvalidId("missing".into()))?;
        let hierarchy_id = hex_field(record, "hierarchy_id", DelegationError::InvalidHierarchyId)?
            .ok_or_else(|| DelegationError::InvalidHierarchyId("missing".into()))?;
        let parent_id = hex_field(record, "parent_id", DelegationError::InvalidParentId)?;
        let account = account_field(record)?;
        let permissions = permissions_field(record)?;
        let revoked = match record.get("revoked") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => return Err(DelegationError::InvalidRevokedFlag),
        };
        let children_ids = children_field(record)?;

        let node = if id == hierarchy_id {
            if let Some(parent) = parent_id {
                return Err(DelegationError::InvalidParentId(format!(
                    "root {id} cannot have parent {parent}"
                )));
            }
            let ctype_hash = hex_field(record, "ctype_hash", DelegationError::InvalidCTypeHash)?
                .ok_or_else(|| DelegationError::InvalidCTypeHash("missing".into()))?;
            Self::Root(HierarchyRoot {
                id: NodeId(id),
                ctype_hash: CTypeHash(ctype_hash),
                account,
                permissions,
                children_ids,
                revoked,
            })
        } else {
            Self::Delegated(DelegatedNode {
                id: NodeId(id),
                hierarchy_id: NodeId(hierarchy_id),
                parent_id: parent_id.map(NodeId),
                account,
                permissions,
                children_ids,
                revoked,
            })
        };
        node.validate()?;
        Ok(node)
    }
}

fn ensure_id(id: &NodeId) -> Result<()> {
    if id.is_well_formed() {
        Ok(())
    } else {
        Err(DelegationError::InvalidId(id.0.clone()))
    }
}

/// Read an optional hex-hash field, normalized to lowercase.
fn hex_field(
    record: &Map<String, Value>,
    key: &str,
    invalid: fn(String) -> DelegationError,
) -> Result<Option<String>> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => normalize_hex_hash(s)
            .map(Some)
            .ok_or_else(|| invalid(s.clone())),
        Some(other) => Err(invalid(other.to_string())),
    }
}

fn account_field(record: &Map<String, Value>) -> Result<AccountId> {
    match record.get("account") {
        None | Some(Value::Null) => Err(DelegationError::MissingAccount),
        Some(Value::String(s)) => AccountId::parse(s),
        Some(other) => Err(DelegationError::InvalidAccount(other.to_string())),
    }
}

/// Permissions come either as a list of names or as the raw bitset.
fn permissions_field(record: &Map<String, Value>) -> Result<Permissions> {
    match record.get("permissions") {
        None | Some(Value::Null) => Err(DelegationError::EmptyPermissions),
        Some(Value::Array(items)) => {
            let parsed = items
                .iter()
                .map(|item| match item {
                    Value::String(name) => Permission::parse(name),
                    other => Err(DelegationError::UnknownPermission(other.to_string())),
                })
                .collect::<Result<Vec<_>>>()?;
            Permissions::new(parsed)
        }
        Some(Value::Number(n)) => {
            let bits = n
                .as_u64()
                .and_then(|bits| u32::try_from(bits).ok())
                .ok_or_else(|| DelegationError::UnknownPermission(n.to_string()))?;
            Permissions::from_bits_strict(bits)
        }
        Some(other) => Err(DelegationError::UnknownPermission(other.to_string())),
    }
}

fn children_field(record: &Map<String, Value>) -> Result<BTreeSet<NodeId>> {
    match record.get("children_ids") {
        None | Some(Value::Null) => Ok(BTreeSet::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => normalize_hex_hash(s).map(NodeId).ok_or_else(|| {
                    DelegationError::InvalidRecord(format!("invalid child id {s}"))
                }),
                other => Err(DelegationError::InvalidRecord(format!(
                    "invalid child id {other}"
                ))),
            })
            .collect(),
        Some(other) => Err(DelegationError::InvalidRecord(format!(
            "children_ids must be a list, got {other}"
        ))),
    }
}
