//! Integrity hash of a delegation node.
//!
//! The hash is what a delegate signs to consent to exactly one position
//! and permission set in a hierarchy. It must be reproduced bit-for-bit by
//! every party, so the byte layout is fixed:
//!
//! ```text
//! BLAKE2b-256( id[32] || hierarchy_id[32] || parent_id[32]? || permissions_le[4] )
//! ```
//!
//! Ids contribute their raw decoded bytes, not their hex text. `parent_id`
//! is only included when present and different from `hierarchy_id`, so a
//! node directly under the root hashes the same whether or not its parent
//! was spelled out. The digest is rendered as `0x`-prefixed lowercase hex.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

use crate::error::{DelegationError, Result};

use super::id::{encode_hex_hash, NodeId, HASH_LEN};
use super::permission::Permissions;

type Blake2b256 = Blake2b<U32>;

/// Compute the integrity hash over a node's identity-relevant fields.
pub fn generate_hash(
    id: &NodeId,
    hierarchy_id: &NodeId,
    parent_id: Option<&NodeId>,
    permissions: Permissions,
) -> Result<String> {
    let digest = generate_hash_bytes(id, hierarchy_id, parent_id, permissions)?;
    Ok(encode_hex_hash(&digest))
}

/// Raw 32-byte digest behind [`generate_hash`]; this is what delegates sign.
pub fn generate_hash_bytes(
    id: &NodeId,
    hierarchy_id: &NodeId,
    parent_id: Option<&NodeId>,
    permissions: Permissions,
) -> Result<[u8; HASH_LEN]> {
    let id_bytes = id
        .to_bytes()
        .ok_or_else(|| DelegationError::InvalidId(id.0.clone()))?;
    let hierarchy_bytes = hierarchy_id
        .to_bytes()
        .ok_or_else(|| DelegationError::InvalidHierarchyId(hierarchy_id.0.clone()))?;
    permissions.validate()?;

    let mut hasher = Blake2b256::new();
    hasher.update(id_bytes);
    hasher.update(hierarchy_bytes);

    if let Some(parent) = parent_id {
        let parent_bytes = parent
            .to_bytes()
            .ok_or_else(|| DelegationError::InvalidParentId(parent.0.clone()))?;
        if parent_bytes != hierarchy_bytes {
            hasher.update(parent_bytes);
        }
    }

    hasher.update(permissions.to_le_bytes());
    let mut digest = [0u8; HASH_LEN];
    digest.copy_from_slice(&hasher.finalize());
    Ok(digest)
}
