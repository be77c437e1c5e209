//! Stress test: ancestor search along a chain of 1000 distinctly owned nodes.

use agentic_delegation::{
    AccountId, CTypeHash, DelegatedNode, DelegationNode, HierarchyRoot, MemoryLedger, NodeId,
    Permissions, TreeNavigator,
};

const DEPTH: usize = 1_000;

fn account(i: usize) -> AccountId {
    AccountId::from_public_key_bytes(format!("owner-{i}").as_bytes())
}

/// `chain[0]` is the root; `chain[i]` is owned by `account(i)`.
fn seed_chain(ledger: &MemoryLedger) -> Vec<DelegationNode> {
    let root = HierarchyRoot::new(CTypeHash(format!("0x{}", "cc".repeat(32))), account(0));
    ledger.seed_root(root.clone()).expect("seed root");

    let mut chain = vec![DelegationNode::from(root.clone())];
    let mut parent: NodeId = root.id.clone();
    for i in 1..DEPTH {
        let node = DelegatedNode::new(
            root.id.clone(),
            Some(parent.clone()),
            account(i),
            Permissions::all(),
        );
        ledger.seed_delegation(node.clone()).expect("seed node");
        parent = node.id.clone();
        chain.push(DelegationNode::from(node));
    }
    chain
}

#[tokio::test]
async fn stress_steps_match_distance() {
    let ledger = MemoryLedger::new(account(0));
    let chain = seed_chain(&ledger);
    let deepest = &chain[DEPTH - 1];
    let nav = TreeNavigator::new(&ledger);

    for i in [0usize, 1, 2, 10, 499, 998, 999] {
        let owner_index = DEPTH - 1 - i;
        let search = nav
            .find_ancestor_owned_by(deepest, &account(owner_index))
            .await
            .unwrap();
        assert_eq!(search.steps, i as u32, "owner {owner_index}");
        assert_eq!(
            search.node.as_ref().map(|n| n.id()),
            Some(chain[owner_index].id())
        );
    }
}

#[tokio::test]
async fn stress_owner_below_start_is_not_found() {
    let ledger = MemoryLedger::new(account(0));
    let chain = seed_chain(&ledger);
    let nav = TreeNavigator::new(&ledger);

    // account(900) owns a descendant of chain[100], not an ancestor.
    let search = nav
        .find_ancestor_owned_by(&chain[100], &account(900))
        .await
        .unwrap();
    assert!(!search.is_found());
    assert_eq!(search.steps, 100);
}

#[tokio::test]
async fn stress_unknown_account_walks_to_root() {
    let ledger = MemoryLedger::new(account(0));
    let chain = seed_chain(&ledger);
    let nav = TreeNavigator::new(&ledger);

    let stranger = AccountId::from_public_key_bytes(b"stranger");
    let search = nav
        .find_ancestor_owned_by(&chain[DEPTH - 1], &stranger)
        .await
        .unwrap();
    assert_eq!(search.steps, (DEPTH - 1) as u32);
    assert!(search.node.is_none());
}

#[tokio::test]
async fn stress_revoke_deep_node_by_root_owner() {
    let ledger = MemoryLedger::new(account(0));
    let chain = seed_chain(&ledger);

    let target = &chain[DEPTH - 1];
    let tx = target.revoke_tx(&ledger, &account(0)).await.unwrap();
    tx.submit(&ledger).await.unwrap();

    assert!(!target.verify(&ledger).await.unwrap());
    assert!(chain[DEPTH - 2].verify(&ledger).await.unwrap());
}
