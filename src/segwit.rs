//! Segregated Witness detection and witness commitment construction

use crate::constants::{
    OP_RETURN, WITNESS_COMMITMENT_HEADER, WITNESS_COMMITMENT_SCRIPT_SIZE, WITNESS_RESERVED_VALUE,
};
use crate::error::{AssemblyError, Result};
use crate::merkle::{merkle_root, sha256d};
use crate::types::{Hash, TxData, NULL_HASH};

/// SegWit is active for a template when any transaction reports a wtxid
/// distinct from its txid.
pub fn is_segwit_enabled(transactions: &[TxData]) -> bool {
    transactions.iter().any(|tx| tx.witness_hash != tx.txid)
}

/// Witness Merkle root over the selected set: leaf 0 is the zeroed coinbase
/// placeholder, the remaining leaves are the transactions' wtxids.
pub fn witness_merkle_root(selected: &[TxData]) -> Hash {
    let mut leaves = Vec::with_capacity(selected.len() + 1);
    leaves.push(NULL_HASH);
    leaves.extend(selected.iter().map(|tx| tx.witness_hash));
    merkle_root(&leaves)
}

/// Build the full witness commitment output script:
/// `OP_RETURN 0x24 0xaa21a9ed <32-byte commitment>`.
pub fn witness_commitment_script(commitment: &Hash) -> Vec<u8> {
    let mut script = Vec::with_capacity(WITNESS_COMMITMENT_SCRIPT_SIZE);
    script.push(OP_RETURN);
    script.push(36);
    script.extend_from_slice(&WITNESS_COMMITMENT_HEADER);
    script.extend_from_slice(commitment);
    script
}

/// Compute the witness commitment script for the coinbase.
///
/// When the template carries `default_witness_commitment` and the selected
/// set was not filtered, that script is used verbatim. Otherwise the
/// commitment is SHA-256d over the witness Merkle root concatenated with the
/// 32-byte zero witness reserved value.
pub fn witness_commitment(
    default_commitment: Option<&str>,
    tx_filtered: bool,
    selected: &[TxData],
) -> Result<Vec<u8>> {
    if let Some(script_hex) = default_commitment {
        if !tx_filtered {
            return hex::decode(script_hex).map_err(|e| {
                AssemblyError::WitnessComputationFailed(format!(
                    "invalid default_witness_commitment: {e}"
                ))
            });
        }
    }

    let root = witness_merkle_root(selected);
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(&root);
    preimage[32..].copy_from_slice(&WITNESS_RESERVED_VALUE);
    Ok(witness_commitment_script(&sha256d(&preimage)))
}
