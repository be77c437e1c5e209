//! Configuration for traversal and the in-memory ledger.
//!
//! Both configs deserialize from JSON with every field optional; missing
//! fields take their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{DelegationError, Result};

/// Limits applied while walking a hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Maximum number of sibling lookups in flight at once.
    pub fetch_concurrency: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: 16,
        }
    }
}

impl TraversalConfig {
    /// Parse from JSON and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_concurrency == 0 {
            return Err(DelegationError::InvalidConfig(
                "fetch_concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Bounds enforced by [`MemoryLedger`](crate::ledger::MemoryLedger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Deposit reserved from the payer for every stored node.
    pub deposit: u128,
    /// Largest `max_parent_checks` a submission may carry.
    pub max_parent_checks: u32,
    /// Largest `max_revocations` a revoke submission may carry.
    pub max_revocations: u32,
    /// Largest `max_removals` a removal submission may carry.
    pub max_removals: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            deposit: 1_000_000,
            max_parent_checks: 25_000,
            max_revocations: 25_000,
            max_removals: 25_000,
        }
    }
}

impl LedgerConfig {
    /// Parse from JSON and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_revocations == 0 || self.max_removals == 0 {
            return Err(DelegationError::InvalidConfig(
                "max_revocations and max_removals must be positive".into(),
            ));
        }
        Ok(())
    }
}
