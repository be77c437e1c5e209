//! Tree navigation over ledger-backed hierarchies.
//!
//! Both walks are iterative: subtree counting keeps an explicit stack of
//! pending nodes and the ancestor search is a loop over parents, so depth
//! is bounded by heap rather than by the call stack. Siblings are fetched
//! concurrently, levels sequentially, since child ids are only known once
//! the parent's list has been read.

use std::collections::HashSet;

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, trace, warn};

use crate::config::TraversalConfig;
use crate::error::{DelegationError, Result};
use crate::identity::AccountId;
use crate::ledger::{LedgerError, LedgerGateway};

use super::id::NodeId;
use super::node::DelegationNode;

/// Outcome of [`TreeNavigator::find_ancestor_owned_by`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorSearch {
    /// Hops walked upward from the starting node.
    pub steps: u32,
    /// The first node owned by the target account, if any.
    pub node: Option<DelegationNode>,
}

impl AncestorSearch {
    pub fn is_found(&self) -> bool {
        self.node.is_some()
    }
}

/// Read-only walks over a hierarchy stored behind a [`LedgerGateway`].
pub struct TreeNavigator<'a, L: ?Sized> {
    ledger: &'a L,
    config: TraversalConfig,
}

impl<'a, L> TreeNavigator<'a, L>
where
    L: LedgerGateway + ?Sized,
{
    pub fn new(ledger: &'a L) -> Self {
        Self {
            ledger,
            config: TraversalConfig::default(),
        }
    }

    pub fn with_config(ledger: &'a L, config: TraversalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { ledger, config })
    }

    /// Resolve a node's children, sorted by id.
    ///
    /// A listed child the ledger cannot return means client and ledger
    /// disagree about the tree; that is reported as `ChildNotFound`.
    pub async fn children_of(&self, node: &DelegationNode) -> Result<Vec<DelegationNode>> {
        node.validate()?;
        self.fetch_children(node).await
    }

    async fn fetch_children(&self, node: &DelegationNode) -> Result<Vec<DelegationNode>> {
        let child_ids = self.ledger.get_children(node.id()).await?;
        if child_ids.is_empty() {
            return Ok(Vec::new());
        }
        trace!("resolving {} children of {}", child_ids.len(), node.id());

        let ledger = self.ledger;
        let lookups = child_ids.into_iter().map(|child_id| async move {
            let found = ledger.query(&child_id).await?;
            Ok::<_, LedgerError>((child_id, found))
        });
        let resolved: Vec<(NodeId, Option<DelegationNode>)> = stream::iter(lookups)
            .buffer_unordered(self.config.fetch_concurrency)
            .try_collect()
            .await?;

        let mut children = Vec::with_capacity(resolved.len());
        for (child_id, found) in resolved {
            match found {
                Some(child) => children.push(child),
                None => {
                    warn!(
                        "ledger lists {} as child of {} but cannot return it",
                        child_id,
                        node.id()
                    );
                    return Err(DelegationError::ChildNotFound {
                        parent: node.id().to_string(),
                        child: child_id.to_string(),
                    });
                }
            }
        }
        children.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(children)
    }

    /// Fetch a node's parent. The root has none.
    pub async fn parent_of(&self, node: &DelegationNode) -> Result<Option<DelegationNode>> {
        node.validate()?;
        self.fetch_parent(node).await
    }

    async fn fetch_parent(&self, node: &DelegationNode) -> Result<Option<DelegationNode>> {
        let Some(parent_id) = node.effective_parent_id() else {
            return Ok(None);
        };
        match self.ledger.query(parent_id).await? {
            Some(parent) => Ok(Some(parent)),
            None => {
                warn!("parent {} of {} missing from ledger", parent_id, node.id());
                Err(DelegationError::ParentNotFound {
                    node: node.id().to_string(),
                    parent: parent_id.to_string(),
                })
            }
        }
    }

    /// Number of descendants of `node`, not counting `node` itself.
    pub async fn subtree_node_count(&self, node: &DelegationNode) -> Result<u32> {
        node.validate()?;
        let mut pending = vec![node.clone()];
        let mut seen: HashSet<NodeId> = HashSet::new();
        seen.insert(node.id().clone());
        let mut count: u32 = 0;

        while let Some(current) = pending.pop() {
            for child in self.fetch_children(&current).await? {
                if !seen.insert(child.id().clone()) {
                    return Err(DelegationError::CycleDetected(child.id().to_string()));
                }
                count = count.saturating_add(1);
                pending.push(child);
            }
        }

        debug!("subtree of {} holds {count} nodes", node.id());
        Ok(count)
    }

    /// Walk upward from `node` until a node owned by `account` is found.
    ///
    /// `node` itself is checked first at zero steps. Each hop to a parent
    /// adds one step. If the root is passed without a match, `steps` is the
    /// distance from `node` to the root and `node` is `None`.
    pub async fn find_ancestor_owned_by(
        &self,
        node: &DelegationNode,
        account: &AccountId,
    ) -> Result<AncestorSearch> {
        node.validate()?;
        account.validate()?;
        let mut current = node.clone();
        let mut steps: u32 = 0;
        let mut visited: HashSet<NodeId> = HashSet::new();

        loop {
            if current.account() == account {
                debug!(
                    "{account} owns {} at {steps} steps above {}",
                    current.id(),
                    node.id()
                );
                return Ok(AncestorSearch {
                    steps,
                    node: Some(current),
                });
            }
            if !visited.insert(current.id().clone()) {
                return Err(DelegationError::CycleDetected(current.id().to_string()));
            }
            match self.fetch_parent(&current).await? {
                Some(parent) => {
                    current = parent;
                    steps += 1;
                }
                None => {
                    debug!("{account} owns no ancestor of {} ({steps} hops to root)", node.id());
                    return Ok(AncestorSearch { steps, node: None });
                }
            }
        }
    }
}
