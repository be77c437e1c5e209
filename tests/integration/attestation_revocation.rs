//! Integration test: who may revoke an attestation, and with how many checks.
//!
//! Hierarchy: root (r) → issuer (i) → sub (s). The attestation is issued
//! by `s` under the `sub` node.

use agentic_delegation::{
    AccountId, Attestation, AuthorizationChecker, CTypeHash, DelegatedNode, DelegationError,
    DelegationTx, HierarchyRoot, LedgerError, MemoryLedger, NodeId, Permissions,
};

fn account(seed: &str) -> AccountId {
    AccountId::from_public_key_bytes(seed.as_bytes())
}

fn ctype() -> CTypeHash {
    CTypeHash(format!("0x{}", "cc".repeat(32)))
}

fn claim_hash(n: u8) -> String {
    format!("0x{}", hex::encode([n; 32]))
}

fn setup() -> (MemoryLedger, Attestation, NodeId) {
    let _ = env_logger::builder().is_test(true).try_init();
    let ledger = MemoryLedger::new(account("r"));
    let root = HierarchyRoot::new(ctype(), account("r"));
    ledger.seed_root(root.clone()).unwrap();
    let issuer = DelegatedNode::new(root.id.clone(), None, account("i"), Permissions::all());
    ledger.seed_delegation(issuer.clone()).unwrap();
    let sub = DelegatedNode::new(
        root.id.clone(),
        Some(issuer.id.clone()),
        account("s"),
        Permissions::attest(),
    );
    ledger.seed_delegation(sub.clone()).unwrap();

    let attestation = Attestation::new(claim_hash(7), ctype(), account("s"), Some(sub.id.clone()));
    ledger.insert_attestation(attestation.clone()).unwrap();
    (ledger, attestation, sub.id)
}

#[tokio::test]
async fn owner_needs_zero_checks() {
    let (ledger, attestation, _) = setup();
    let checker = AuthorizationChecker::new(&ledger);
    assert_eq!(
        checker.count_node_depth(&account("s"), &attestation).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn ancestor_needs_distance_plus_one() {
    let (ledger, attestation, _) = setup();
    let checker = AuthorizationChecker::new(&ledger);
    assert_eq!(
        checker.count_node_depth(&account("i"), &attestation).await.unwrap(),
        2
    );
    assert_eq!(
        checker.count_node_depth(&account("r"), &attestation).await.unwrap(),
        3
    );
}

#[tokio::test]
async fn unrelated_account_is_unauthorized() {
    let (ledger, attestation, _) = setup();
    let checker = AuthorizationChecker::new(&ledger);
    let err = checker
        .count_node_depth(&account("mallory"), &attestation)
        .await
        .unwrap_err();
    assert!(matches!(err, DelegationError::Unauthorized(_)));
}

#[tokio::test]
async fn attestation_without_delegation() {
    let ledger = MemoryLedger::new(account("r"));
    let attestation = Attestation::new(claim_hash(9), ctype(), account("s"), None);
    let checker = AuthorizationChecker::new(&ledger);

    assert_eq!(
        checker.count_node_depth(&account("s"), &attestation).await.unwrap(),
        0
    );
    assert!(checker
        .count_node_depth(&account("r"), &attestation)
        .await
        .unwrap_err()
        .is_unauthorized());
}

#[tokio::test]
async fn ancestor_revocation_accepted_by_ledger() {
    let (ledger, attestation, sub_id) = setup();
    let tx = attestation.revoke_tx(&ledger, &account("i")).await.unwrap();
    assert_eq!(
        tx,
        DelegationTx::RevokeAttestation {
            claim_hash: attestation.claim_hash.clone(),
            submitter: account("i"),
            max_parent_checks: 2,
        }
    );

    // Signed by the wrong account.
    assert!(matches!(
        tx.submit(&ledger).await,
        Err(DelegationError::Ledger(LedgerError::UnauthorizedRevocation))
    ));

    tx.submit(&ledger.as_submitter(account("i"))).await.unwrap();
    assert!(ledger.attestation(&attestation.claim_hash).unwrap().revoked);

    let hashes = agentic_delegation::LedgerGateway::get_attestation_hashes(&ledger, &sub_id)
        .await
        .unwrap();
    assert_eq!(hashes, vec![attestation.claim_hash.clone()]);
}

#[tokio::test]
async fn too_few_checks_rejected_by_ledger() {
    let (ledger, attestation, _) = setup();
    let tx = DelegationTx::RevokeAttestation {
        claim_hash: attestation.claim_hash.clone(),
        submitter: account("r"),
        max_parent_checks: 2,
    };
    assert!(matches!(
        tx.submit(&ledger).await,
        Err(DelegationError::Ledger(LedgerError::ExceededParentChecks))
    ));
}
