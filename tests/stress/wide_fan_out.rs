//! Stress test: nodes with many children.
//!
//! Children are fetched concurrently; results must not depend on the
//! concurrency limit.

use agentic_delegation::{
    AccountId, CTypeHash, DelegatedNode, DelegationNode, HierarchyRoot, MemoryLedger,
    Permissions, TraversalConfig, TreeNavigator,
};

const FAN_OUT: usize = 500;

fn account(seed: &str) -> AccountId {
    AccountId::from_public_key_bytes(seed.as_bytes())
}

fn seed_fan(ledger: &MemoryLedger) -> DelegationNode {
    let root = HierarchyRoot::new(CTypeHash(format!("0x{}", "cc".repeat(32))), account("root"));
    ledger.seed_root(root.clone()).expect("seed root");
    for i in 0..FAN_OUT {
        let child = DelegatedNode::new(
            root.id.clone(),
            None,
            account(&format!("child-{i}")),
            Permissions::attest(),
        );
        ledger.seed_delegation(child).expect("seed child");
    }
    DelegationNode::from(root)
}

#[tokio::test]
async fn stress_500_children_resolved_and_sorted() {
    let ledger = MemoryLedger::new(account("payer"));
    let root = seed_fan(&ledger);

    let children = root.get_children(&ledger).await.unwrap();
    assert_eq!(children.len(), FAN_OUT);
    assert!(children.windows(2).all(|pair| pair[0].id() < pair[1].id()));
    assert!(children.iter().all(|c| c.parent_id().is_none()));
}

#[tokio::test]
async fn stress_counts_agree_across_concurrency() {
    let ledger = MemoryLedger::new(account("payer"));
    let root = seed_fan(&ledger);

    for fetch_concurrency in [1, 4, 16, 256] {
        let nav = TreeNavigator::with_config(&ledger, TraversalConfig { fetch_concurrency })
            .expect("valid config");
        assert_eq!(
            nav.subtree_node_count(&root).await.unwrap(),
            FAN_OUT as u32,
            "fetch_concurrency={fetch_concurrency}"
        );
    }
}

#[tokio::test]
async fn stress_revoke_root_cascades_to_all_children() {
    let ledger = MemoryLedger::new(account("root"));
    let root = seed_fan(&ledger);

    let tx = root.revoke_tx(&ledger, &account("root")).await.unwrap();
    tx.submit(&ledger).await.unwrap();

    for child in root.get_children(&ledger).await.unwrap() {
        assert!(child.is_revoked());
    }
    assert!(!root.verify(&ledger).await.unwrap());
}
