//! Permission bit flags.
//!
//! A delegation carries a non-empty subset of two capabilities, packed
//! into a `u32` bitset: `ATTEST` is bit 0, `DELEGATE` is bit 1. Decoding
//! ignores bits it does not know so newer ledgers stay readable.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{DelegationError, Result};

/// A single capability held by a delegation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// May issue attestations within the hierarchy's ctype.
    Attest,
    /// May create child delegations.
    Delegate,
}

impl Permission {
    /// Every defined permission, in bit order.
    pub const ALL: [Permission; 2] = [Permission::Attest, Permission::Delegate];

    /// The flag bit of this permission.
    pub const fn bit(self) -> u32 {
        match self {
            Self::Attest => 1 << 0,
            Self::Delegate => 1 << 1,
        }
    }

    /// Return a stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attest => "ATTEST",
            Self::Delegate => "DELEGATE",
        }
    }

    /// Parse a permission name.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "ATTEST" => Ok(Self::Attest),
            "DELEGATE" => Ok(Self::Delegate),
            other => Err(DelegationError::UnknownPermission(other.to_string())),
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const KNOWN_BITS: u32 = Permission::Attest.bit() | Permission::Delegate.bit();

/// A set of permissions stored as its bit encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<Permission>", try_from = "Vec<Permission>")]
pub struct Permissions(u32);

impl Permissions {
    /// Build a non-empty permission set.
    pub fn new(permissions: impl IntoIterator<Item = Permission>) -> Result<Self> {
        let set = Self(permissions.into_iter().fold(0, |bits, p| bits | p.bit()));
        set.validate()?;
        Ok(set)
    }

    /// Both `ATTEST` and `DELEGATE`.
    pub fn all() -> Self {
        Self(KNOWN_BITS)
    }

    /// Only `ATTEST`.
    pub fn attest() -> Self {
        Self(Permission::Attest.bit())
    }

    /// Only `DELEGATE`.
    pub fn delegate() -> Self {
        Self(Permission::Delegate.bit())
    }

    /// Pack into the bit-flag encoding.
    pub fn encode(&self) -> u32 {
        self.0
    }

    /// Reconstruct from bits, dropping anything outside the defined flags.
    pub fn decode(bits: u32) -> Self {
        Self(bits & KNOWN_BITS)
    }

    /// Reconstruct from bits, rejecting unknown flags and the empty set.
    pub fn from_bits_strict(bits: u32) -> Result<Self> {
        let unknown = bits & !KNOWN_BITS;
        if unknown != 0 {
            return Err(DelegationError::UnknownPermission(format!(
                "bits {unknown:#x}"
            )));
        }
        let set = Self(bits);
        set.validate()?;
        Ok(set)
    }

    /// Little-endian bytes of the encoding, as fed to the integrity hash.
    pub fn to_le_bytes(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0 & permission.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate over the contained permissions in bit order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL.into_iter().filter(|p| self.contains(*p))
    }

    /// The permissions as an ordered set.
    pub fn to_set(&self) -> BTreeSet<Permission> {
        self.iter().collect()
    }

    /// Check the set is non-empty and holds only defined flags.
    pub fn validate(&self) -> Result<()> {
        if self.0 & !KNOWN_BITS != 0 {
            return Err(DelegationError::UnknownPermission(format!(
                "bits {:#x}",
                self.0 & !KNOWN_BITS
            )));
        }
        if self.is_empty() {
            return Err(DelegationError::EmptyPermissions);
        }
        Ok(())
    }
}

impl From<Permissions> for Vec<Permission> {
    fn from(set: Permissions) -> Self {
        set.iter().collect()
    }
}

impl TryFrom<Vec<Permission>> for Permissions {
    type Error = DelegationError;

    fn try_from(list: Vec<Permission>) -> Result<Self> {
        Permissions::new(list)
    }
}

impl From<Permission> for Permissions {
    fn from(p: Permission) -> Self {
        Self(p.bit())
    }
}
