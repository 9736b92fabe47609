//! Coinbase construction with in-place extranonce offsets

use crate::codec::serialize_for_coinbase;
use crate::config::MiningConfig;
use crate::constants::{
    ADDRESS_SIZE, COINBASE_PREVOUT_INDEX, OP_CHECKSIG, OP_DUP, OP_EQUALVERIFY, OP_HASH160,
    SEQUENCE_FINAL, WITNESS_RESERVED_VALUE,
};
use crate::error::{AssemblyError, Result};
use crate::types::{CoinbaseTx, Transaction, TxIn, TxOut, NULL_HASH};

/// Everything the template contributes to the coinbase.
#[derive(Debug, Clone, Copy)]
pub struct CoinbaseContext<'a> {
    pub height: u64,
    pub block_reward: i64,
    /// Hash-160 of the pool payout address. Size checking happens once at
    /// [`crate::work::Work::new`]; the fixed-size type carries that fact.
    pub mining_address: &'a [u8; ADDRESS_SIZE],
    pub coinbase_message: &'a [u8],
    /// Caller-supplied extra bytes placed ahead of the message, may be empty
    pub coinbase_extra: &'a [u8],
    pub dev_fee: i64,
    pub dev_script: &'a [u8],
    pub segwit_enabled: bool,
    /// Full witness commitment output script, required when SegWit is on
    pub witness_commitment: &'a [u8],
}

/// Build and serialize the coinbase transaction in both forms.
///
/// The scriptSig is assembled as BIP-34 height bytes, the extra-data region,
/// the coinbase message, and a zeroed extranonce region of
/// `fixed_extra_nonce_size + mutable_extra_nonce_size` bytes. The returned
/// offsets are absolute positions within each serialized form, so miners can
/// overwrite the extranonce bytes in place without reserializing.
pub fn build_coinbase(
    ctx: &CoinbaseContext,
    cfg: &MiningConfig,
) -> Result<(CoinbaseTx, CoinbaseTx)> {
    // scriptSig scratch buffer; offsets are local until translated below
    let mut script_sig = Vec::new();
    serialize_for_coinbase(&mut script_sig, ctx.height);
    let extra_data_local = script_sig.len();
    script_sig.extend_from_slice(ctx.coinbase_extra);
    script_sig.extend_from_slice(ctx.coinbase_message);
    let extra_nonce_local = script_sig.len();
    let extra_nonce_size =
        cfg.fixed_extra_nonce_size as usize + cfg.mutable_extra_nonce_size as usize;
    script_sig.resize(script_sig.len() + extra_nonce_size, 0);

    let witness_stack = if ctx.segwit_enabled {
        vec![WITNESS_RESERVED_VALUE.to_vec()]
    } else {
        Vec::new()
    };

    let mut outputs = Vec::with_capacity(3);
    let mut payout_script = Vec::with_capacity(ADDRESS_SIZE + 5);
    payout_script.push(OP_DUP);
    payout_script.push(OP_HASH160);
    payout_script.push(ADDRESS_SIZE as u8);
    payout_script.extend_from_slice(ctx.mining_address);
    payout_script.push(OP_EQUALVERIFY);
    payout_script.push(OP_CHECKSIG);
    outputs.push(TxOut {
        value: ctx.block_reward,
        pk_script: payout_script,
    });

    if ctx.dev_fee > 0 {
        outputs.push(TxOut {
            value: ctx.dev_fee,
            pk_script: ctx.dev_script.to_vec(),
        });
    }

    if ctx.segwit_enabled {
        outputs.push(TxOut {
            value: 0,
            pk_script: ctx.witness_commitment.to_vec(),
        });
    }

    let coinbase = Transaction {
        version: if ctx.segwit_enabled { 2 } else { 1 },
        inputs: vec![TxIn {
            previous_output_hash: NULL_HASH,
            previous_output_index: COINBASE_PREVOUT_INDEX,
            script_sig,
            sequence: SEQUENCE_FINAL,
            witness_stack,
        }],
        outputs,
        lock_time: 0,
    };

    let legacy_base = coinbase
        .first_script_sig_offset(false)
        .ok_or_else(|| AssemblyError::MalformedTransaction("coinbase has no input".into()))?;
    let witness_base = coinbase
        .first_script_sig_offset(true)
        .ok_or_else(|| AssemblyError::MalformedTransaction("coinbase has no input".into()))?;

    let legacy = CoinbaseTx {
        data: coinbase.serialize(false),
        extra_data_offset: extra_data_local + legacy_base,
        extra_nonce_offset: extra_nonce_local + legacy_base,
    };
    let witness = CoinbaseTx {
        data: coinbase.serialize(true),
        extra_data_offset: extra_data_local + witness_base,
        extra_nonce_offset: extra_nonce_local + witness_base,
    };
    Ok((legacy, witness))
}
