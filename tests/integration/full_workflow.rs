//! Integration test: full end-to-end hierarchy lifecycle.
//!
//! 1. Create a root and store it
//! 2. Delegate to A, then A delegates to B, each consented by signature
//! 3. Read the tree back from the ledger
//! 4. Revoke A as the root owner and check the cascade
//! 5. Remove the hierarchy and reclaim deposits

use agentic_delegation::{
    AccountId, CTypeHash, DelegatedNode, DelegationError, DelegationNode, DelegationTx,
    HierarchyRoot, KeyPairSigner, LedgerError, MemoryLedger, NodeId, Permission, Permissions,
    Signer, TxKind,
};

fn ctype() -> CTypeHash {
    CTypeHash(format!("0x{}", "ab".repeat(32)))
}

struct Fixture {
    r: KeyPairSigner,
    a: KeyPairSigner,
    b: KeyPairSigner,
    ledger: MemoryLedger,
    root: DelegationNode,
    node_a: DelegationNode,
    node_b: DelegationNode,
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

async fn build_hierarchy() -> Fixture {
    init_logging();
    let r = KeyPairSigner::generate();
    let a = KeyPairSigner::generate();
    let b = KeyPairSigner::generate();
    let ledger = MemoryLedger::new(r.account());

    let root = HierarchyRoot::new(ctype(), r.account());
    root.store_tx()
        .expect("root request")
        .submit(&ledger)
        .await
        .expect("store root");

    let node_a = DelegatedNode::new(root.id.clone(), None, a.account(), Permissions::all());
    let sig_a = node_a.delegee_sign(&a).expect("A consents");
    node_a
        .store_tx(sig_a)
        .expect("A request")
        .submit(&ledger)
        .await
        .expect("store A");

    let node_b = DelegatedNode::new(
        root.id.clone(),
        Some(node_a.id.clone()),
        b.account(),
        Permissions::attest(),
    );
    let sig_b = node_b.delegee_sign(&b).expect("B consents");
    node_b
        .store_tx(sig_b)
        .expect("B request")
        .submit(&ledger.as_submitter(a.account()))
        .await
        .expect("store B");

    let fetch = |id: NodeId| {
        let ledger = ledger.clone();
        async move {
            DelegationNode::fetch(&ledger, &id)
                .await
                .expect("fetch")
                .expect("stored")
        }
    };
    let root_node = fetch(root.id.clone()).await;
    let node_a = fetch(node_a.id.clone()).await;
    let node_b = fetch(node_b.id.clone()).await;

    Fixture {
        r,
        a,
        b,
        ledger,
        root: root_node,
        node_a,
        node_b,
    }
}

#[tokio::test]
async fn full_workflow_store_read_revoke() {
    let f = build_hierarchy().await;

    // ── Reads ───────────────────────────────────────────────────────────
    assert!(f.root.verify(&f.ledger).await.unwrap());
    assert!(f.node_a.verify(&f.ledger).await.unwrap());
    assert!(f.node_b.verify(&f.ledger).await.unwrap());

    let children = f.root.get_children(&f.ledger).await.unwrap();
    assert_eq!(children, vec![f.node_a.clone()]);
    assert_eq!(
        f.node_b.get_parent(&f.ledger).await.unwrap().map(|p| p.id().clone()),
        Some(f.node_a.id().clone())
    );
    assert!(f.root.get_parent(&f.ledger).await.unwrap().is_none());

    let details = f.node_b.get_hierarchy_details(&f.ledger).await.unwrap();
    assert_eq!(&details.root_id, f.root.id());
    assert_eq!(details.ctype_hash, ctype());
    assert_eq!(f.node_b.get_root(&f.ledger).await.unwrap().account, f.r.account());

    assert!(f.node_a.has_permission(Permission::Delegate));
    assert!(!f.node_b.has_permission(Permission::Delegate));
    assert_eq!(f.root.subtree_node_count(&f.ledger).await.unwrap(), 2);

    // ── Revoke A as the root owner ──────────────────────────────────────
    let tx = f.node_a.revoke_tx(&f.ledger, &f.r.account()).await.unwrap();
    assert_eq!(
        tx,
        DelegationTx::Revoke {
            id: f.node_a.id().clone(),
            submitter: f.r.account(),
            max_parent_checks: 1,
            max_revocations: 1,
        }
    );
    let pending = tx.submit(&f.ledger).await.unwrap();
    assert_eq!(pending.kind, TxKind::Revoke);

    assert!(!f.node_a.verify(&f.ledger).await.unwrap());
    assert!(!f.node_b.verify(&f.ledger).await.unwrap());
    assert!(f.root.verify(&f.ledger).await.unwrap());
}

#[tokio::test]
async fn full_workflow_self_revocation_needs_no_parent_checks() {
    let f = build_hierarchy().await;
    let tx = f.node_b.revoke_tx(&f.ledger, &f.b.account()).await.unwrap();
    let DelegationTx::Revoke {
        max_parent_checks,
        max_revocations,
        ..
    } = tx
    else {
        panic!("expected a revoke request");
    };
    assert_eq!(max_parent_checks, 0);
    assert_eq!(max_revocations, 0);

    tx.submit(&f.ledger.as_submitter(f.b.account())).await.unwrap();
    assert!(!f.node_b.verify(&f.ledger).await.unwrap());
    assert!(f.node_a.verify(&f.ledger).await.unwrap());
}

#[tokio::test]
async fn full_workflow_descendant_cannot_revoke_ancestor() {
    let f = build_hierarchy().await;
    let err = f
        .node_a
        .revoke_tx(&f.ledger, &f.b.account())
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(matches!(err, DelegationError::Unauthorized(_)));
}

#[tokio::test]
async fn full_workflow_ledger_rejection_passes_through() {
    let f = build_hierarchy().await;
    // A forged request claiming zero parent checks for the root owner.
    let tx = DelegationTx::Revoke {
        id: f.node_b.id().clone(),
        submitter: f.r.account(),
        max_parent_checks: 0,
        max_revocations: 0,
    };
    let err = tx.submit(&f.ledger).await.unwrap_err();
    assert!(matches!(
        err,
        DelegationError::Ledger(LedgerError::ExceededParentChecks)
    ));
    assert_eq!(err.to_string(), LedgerError::ExceededParentChecks.to_string());
}

#[tokio::test]
async fn full_workflow_verify_absent_node() {
    let f = build_hierarchy().await;
    let ghost = DelegationNode::from(DelegatedNode::new(
        f.root.id().clone(),
        None,
        f.a.account(),
        Permissions::all(),
    ));
    assert!(!ghost.verify(&f.ledger).await.unwrap());
    assert!(DelegationNode::fetch(&f.ledger, ghost.id())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn full_workflow_remove_and_reclaim() {
    let f = build_hierarchy().await;
    let deposit = f.ledger.config().deposit;
    assert_eq!(f.ledger.reserved_deposit(&f.r.account()), 2 * deposit);
    assert_eq!(f.ledger.reserved_deposit(&f.a.account()), deposit);

    // A paid for B, so the root owner cannot remove it.
    let tx = f.node_b.remove_tx(&f.ledger).await.unwrap();
    assert!(matches!(
        tx.submit(&f.ledger).await,
        Err(DelegationError::Ledger(LedgerError::UnauthorizedRemoval))
    ));
    tx.submit(&f.ledger.as_submitter(f.a.account())).await.unwrap();
    assert_eq!(f.ledger.reserved_deposit(&f.a.account()), 0);
    assert!(!f.node_b.verify(&f.ledger).await.unwrap());

    let tx = f.root.reclaim_deposit_tx(&f.ledger).await.unwrap();
    assert_eq!(tx.kind(), TxKind::ReclaimDeposit);
    tx.submit(&f.ledger).await.unwrap();
    assert_eq!(f.ledger.reserved_deposit(&f.r.account()), 0);
    assert!(matches!(
        f.node_a.get_hierarchy_details(&f.ledger).await,
        Err(DelegationError::HierarchyNotFound(_))
    ));
}

#[tokio::test]
async fn full_workflow_json_round_trip_of_fetched_node() {
    let f = build_hierarchy().await;
    let json = serde_json::json!({
        "id": f.node_b.id().as_str(),
        "hierarchy_id": f.root.id().as_str(),
        "parent_id": f.node_a.id().as_str(),
        "account": f.b.account().as_str(),
        "permissions": ["ATTEST"],
        "revoked": false,
    });
    let parsed = DelegationNode::from_value(&json).unwrap();
    assert_eq!(parsed.generate_hash().unwrap(), f.node_b.generate_hash().unwrap());
    assert_eq!(parsed.account(), &f.b.account());
    assert!(AccountId::parse(f.b.account().as_str()).is_ok());
}
