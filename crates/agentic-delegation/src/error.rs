//! Error types for AgenticDelegation.
//!
//! Structural problems are detected locally and reported before any ledger
//! call is made. Ledger-originated failures are wrapped without being
//! reinterpreted. Absence of a node is never an error at the query layer;
//! it only becomes one when the tree itself is inconsistent.

use crate::ledger::LedgerError;

/// Delegation error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum DelegationError {
    #[error("Invalid node id: {0}")]
    InvalidId(String),

    #[error("Invalid parent id: {0}")]
    InvalidParentId(String),

    #[error("Invalid hierarchy id: {0}")]
    InvalidHierarchyId(String),

    #[error("Invalid ctype hash: {0}")]
    InvalidCTypeHash(String),

    #[error("Invalid claim hash: {0}")]
    InvalidClaimHash(String),

    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    #[error("Missing account")]
    MissingAccount,

    #[error("Permission set is empty")]
    EmptyPermissions,

    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    #[error("Revoked flag must be a boolean")]
    InvalidRevokedFlag,

    #[error("Invalid node record: {0}")]
    InvalidRecord(String),

    #[error("Node is not a hierarchy root: {0}")]
    NotRoot(String),

    #[error("Node is a hierarchy root, not a delegation: {0}")]
    NotDelegated(String),

    #[error("Delegate signature does not match node: {0}")]
    SignatureMismatch(String),

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Delegation node not found: {0}")]
    NodeNotFound(String),

    #[error("Child {child} of node {parent} not found on ledger")]
    ChildNotFound { parent: String, child: String },

    #[error("Parent {parent} of node {node} not found on ledger")]
    ParentNotFound { node: String, parent: String },

    #[error("Hierarchy not found: {0}")]
    HierarchyNotFound(String),

    #[error("Cycle detected at node {0}")]
    CycleDetected(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl DelegationError {
    /// Structural violations detected before any ledger call.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::InvalidId(_)
                | Self::InvalidParentId(_)
                | Self::InvalidHierarchyId(_)
                | Self::InvalidCTypeHash(_)
                | Self::InvalidClaimHash(_)
                | Self::InvalidAccount(_)
                | Self::MissingAccount
                | Self::EmptyPermissions
                | Self::UnknownPermission(_)
                | Self::InvalidRevokedFlag
                | Self::InvalidRecord(_)
                | Self::NotRoot(_)
                | Self::NotDelegated(_)
                | Self::SignatureMismatch(_)
        )
    }

    /// Authorization failures, raised locally or returned by the ledger.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Unauthorized(_) => true,
            Self::Ledger(e) => e.is_unauthorized(),
            _ => false,
        }
    }

    /// Only transport-level ledger failures may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Ledger(LedgerError::Unavailable(_)))
    }
}

impl From<serde_json::Error> for DelegationError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, DelegationError>;
