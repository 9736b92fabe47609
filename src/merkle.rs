//! Merkle tree helpers: roots, coinbase authentication paths

use bitcoin_hashes::{sha256d as sha256d_hash, Hash as _};

use crate::types::{Hash, NULL_HASH};

/// Double SHA-256
pub fn sha256d(data: &[u8]) -> Hash {
    sha256d_hash::Hash::hash(data).to_byte_array()
}

/// Join two Merkle nodes: SHA-256d over the 64-byte concatenation.
pub fn merkle_join(left: &Hash, right: &Hash) -> Hash {
    let mut buffer = [0u8; 64];
    buffer[..32].copy_from_slice(left);
    buffer[32..].copy_from_slice(right);
    sha256d(&buffer)
}

/// Compute the Merkle root over a leaf set, duplicating the last node at odd
/// levels. Returns the null hash for an empty leaf set.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return NULL_HASH;
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let right = if pair.len() == 2 { &pair[1] } else { &pair[0] };
            next.push(merkle_join(&pair[0], right));
        }
        level = next;
    }
    level[0]
}

/// Compute the authentication path for the coinbase leaf (index 0) over the
/// leaf set `{coinbase} ∪ txids`.
///
/// The coinbase hash itself is unknown when the path is built (miners mutate
/// the coinbase per share), so the tree is walked with a placeholder in slot
/// zero; the placeholder never appears in the emitted path because the
/// coinbase chain's sibling at every level lies entirely on the transaction
/// side. An empty txid set yields an empty path.
pub fn coinbase_merkle_path(txids: &[Hash]) -> Vec<Hash> {
    let mut path = Vec::new();
    // Nodes of the current level, excluding the coinbase-chain slot
    let mut level = txids.to_vec();
    while !level.is_empty() {
        path.push(level[0]);
        let rest = &level[1..];
        let mut next = Vec::with_capacity(rest.len().div_ceil(2));
        for pair in rest.chunks(2) {
            let right = if pair.len() == 2 { &pair[1] } else { &pair[0] };
            next.push(merkle_join(&pair[0], right));
        }
        level = next;
    }
    path
}

/// Fold a leaf up an authentication path to the Merkle root.
pub fn merkle_root_from_path(leaf: &Hash, path: &[Hash]) -> Hash {
    let mut node = *leaf;
    for step in path {
        node = merkle_join(&node, step);
    }
    node
}
