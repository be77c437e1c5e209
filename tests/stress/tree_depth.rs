//! Stress test: subtree counting over long chains and wide trees.
//!
//! Counting is iterative, so very deep chains must not exhaust the stack.

use agentic_delegation::{
    AccountId, CTypeHash, DelegatedNode, DelegationNode, HierarchyRoot, MemoryLedger, NodeId,
    Permissions, TreeNavigator,
};

fn account(seed: &str) -> AccountId {
    AccountId::from_public_key_bytes(seed.as_bytes())
}

fn ctype() -> CTypeHash {
    CTypeHash(format!("0x{}", "cc".repeat(32)))
}

/// Seed a root with a single chain of `depth` delegations below it.
fn seed_chain(ledger: &MemoryLedger, depth: usize) -> (DelegationNode, Vec<DelegationNode>) {
    let root = HierarchyRoot::new(ctype(), account("root"));
    ledger.seed_root(root.clone()).expect("seed root");

    let mut chain = Vec::with_capacity(depth);
    let mut parent: NodeId = root.id.clone();
    for i in 0..depth {
        let node = DelegatedNode::new(
            root.id.clone(),
            Some(parent.clone()),
            account(&format!("node-{i}")),
            Permissions::all(),
        );
        ledger
            .seed_delegation(node.clone())
            .unwrap_or_else(|e| panic!("seed node {i}: {e}"));
        parent = node.id.clone();
        chain.push(DelegationNode::from(node));
    }
    (DelegationNode::from(root), chain)
}

#[tokio::test]
async fn stress_chain_of_1000_counts_999_below_first() {
    let ledger = MemoryLedger::new(account("payer"));
    let (root, chain) = seed_chain(&ledger, 1_000);
    let nav = TreeNavigator::new(&ledger);

    assert_eq!(nav.subtree_node_count(&root).await.unwrap(), 1_000);
    assert_eq!(nav.subtree_node_count(&chain[0]).await.unwrap(), 999);
    assert_eq!(nav.subtree_node_count(&chain[500]).await.unwrap(), 499);
}

#[tokio::test]
async fn stress_chain_of_10000_does_not_overflow() {
    let ledger = MemoryLedger::new(account("payer"));
    let (root, chain) = seed_chain(&ledger, 10_000);
    let nav = TreeNavigator::new(&ledger);

    assert_eq!(nav.subtree_node_count(&root).await.unwrap(), 10_000);

    let deepest = chain.last().expect("non-empty chain");
    let search = nav
        .find_ancestor_owned_by(deepest, &account("root"))
        .await
        .unwrap();
    assert_eq!(search.steps, 10_000);
    assert!(search.is_found());
}

#[tokio::test]
async fn stress_leaf_counts_zero() {
    let ledger = MemoryLedger::new(account("payer"));
    let (_, chain) = seed_chain(&ledger, 10);
    let nav = TreeNavigator::new(&ledger);
    assert_eq!(nav.subtree_node_count(&chain[9]).await.unwrap(), 0);
}

#[tokio::test]
async fn stress_balanced_tree_depth_6() {
    let ledger = MemoryLedger::new(account("payer"));
    let root = HierarchyRoot::new(ctype(), account("root"));
    ledger.seed_root(root.clone()).unwrap();

    // Binary tree: 2 + 4 + ... + 64 = 126 descendants.
    let mut level = vec![root.id.clone()];
    for depth in 0..6 {
        let mut next = Vec::new();
        for parent in &level {
            for side in 0..2 {
                let node = DelegatedNode::new(
                    root.id.clone(),
                    Some(parent.clone()),
                    account(&format!("d{depth}-{side}-{parent}")),
                    Permissions::all(),
                );
                ledger.seed_delegation(node.clone()).unwrap();
                next.push(node.id);
            }
        }
        level = next;
    }

    let nav = TreeNavigator::new(&ledger);
    let root = DelegationNode::from(root);
    assert_eq!(nav.subtree_node_count(&root).await.unwrap(), 126);
}
