//! Transaction selection: dependency-aware filtering under a count cap

use std::collections::HashMap;

use tracing::warn;

use crate::codec::hash_to_hex;
use crate::error::{AssemblyError, Result};
use crate::types::{Transaction, TxData};

/// Select a prefix of the template's transactions honoring `tx_num_limit`
/// while keeping every selected transaction's in-template ancestors selected
/// before it.
///
/// Fee accounting matches the node's view: every transaction's fee is
/// subtracted from `block_reward` up front, and only the fees of
/// transactions that make it into the result are credited back. Fees of
/// capped-out transactions stay subtracted.
///
/// Dependencies are resolved by decoding each payload and looking up its
/// input hashes among the template txids; `depends_on` records the first
/// match. Ancestor chains are walked with an explicit stack, so templates
/// with long dependency chains cannot overflow the call stack. A transaction
/// that fails to decode (or one whose ancestor does) is dropped with a
/// warning; reaching the cap stops selection entirely.
///
/// When `sort_by_txid` is set the result is re-sorted by ascending txid hex
/// after selection.
pub fn transaction_filter(
    transactions: &[TxData],
    tx_num_limit: usize,
    block_reward: &mut i64,
    sort_by_txid: bool,
) -> Vec<TxData> {
    let tx_num = transactions.len();

    // Build hashmap txid -> index; deduct all fees up front
    let mut txid_map: HashMap<[u8; 32], usize> = HashMap::with_capacity(tx_num);
    for (index, tx) in transactions.iter().enumerate() {
        txid_map.insert(tx.txid, index);
        *block_reward -= tx.fee;
    }

    // Decode payloads and record in-template dependencies
    let mut depends_on: Vec<Option<usize>> = vec![None; tx_num];
    let mut excluded = vec![false; tx_num];
    for (index, tx) in transactions.iter().enumerate() {
        match Transaction::from_hex(&tx.hex_data) {
            Ok(decoded) => {
                depends_on[index] = decoded
                    .inputs
                    .iter()
                    .find_map(|input| txid_map.get(&input.previous_output_hash).copied());
            }
            Err(e) => {
                warn!(txid = %hash_to_hex(&tx.txid), "dropping undecodable template transaction: {e}");
                excluded[index] = true;
            }
        }
    }

    let mut visited = vec![false; tx_num];
    let mut result: Vec<TxData> = Vec::with_capacity(tx_num_limit.min(tx_num));

    'outer: for index in 0..tx_num {
        // Collect the unvisited ancestor chain, newest first
        let mut chain = Vec::new();
        let mut cursor = Some(index);
        let mut droppable = false;
        while let Some(current) = cursor {
            if visited[current] {
                break;
            }
            if excluded[current] || chain.len() > tx_num {
                // Undecodable ancestor, or a template whose claimed
                // dependencies form a cycle
                droppable = true;
                break;
            }
            chain.push(current);
            cursor = depends_on[current];
        }
        if droppable {
            continue;
        }

        // Add ancestors first; refusing at the cap aborts selection
        for &current in chain.iter().rev() {
            if result.len() >= tx_num_limit {
                break 'outer;
            }
            result.push(transactions[current].clone());
            *block_reward += transactions[current].fee;
            visited[current] = true;
        }
    }

    if sort_by_txid {
        result.sort_by(|left, right| hash_to_hex(&left.txid).cmp(&hash_to_hex(&right.txid)));
    }

    result
}

/// The no-cap path: validate each template transaction's payload shape and
/// copy the whole set, without dependency analysis. A malformed payload
/// fails the load.
pub fn transaction_checker(transactions: &[TxData]) -> Result<Vec<TxData>> {
    for tx in transactions {
        if tx.hex_data.is_empty()
            || tx.hex_data.len() % 2 != 0
            || !tx.hex_data.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(AssemblyError::MalformedTransaction(format!(
                "transaction {} carries an invalid hex payload",
                hash_to_hex(&tx.txid)
            )));
        }
    }
    Ok(transactions.to_vec())
}
