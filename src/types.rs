//! Core wire types for block-template assembly

use serde::{Deserialize, Serialize};

use crate::codec::Reader;
use crate::error::Result;

/// Hash type: 256-bit hash, little-endian byte order.
///
/// The all-zero value denotes "null". Hex forms use the reversed (display)
/// byte order; see [`crate::codec::hash_from_hex`].
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// The null hash
pub const NULL_HASH: Hash = [0u8; 32];

/// Transaction input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub previous_output_hash: Hash,
    pub previous_output_index: u32,
    pub script_sig: ByteString,
    pub sequence: u32,
    /// Witness stack, serialized only in witness form
    pub witness_stack: Vec<ByteString>,
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    /// Value in satoshis
    pub value: i64,
    pub pk_script: ByteString,
}

/// Transaction
///
/// Two serialized forms exist: legacy (no witness data, hashed for the txid)
/// and witness (marker/flag bytes plus per-input witness stacks, hashed for
/// the wtxid). See [`Transaction::serialize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

/// Block header, serialized as 80 little-endian bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block_hash: Hash,
    pub merkle_root: Hash,
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    pub fn serialize(&self) -> [u8; 80] {
        let mut out = [0u8; 80];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(&self.prev_block_hash);
        out[36..68].copy_from_slice(&self.merkle_root);
        out[68..72].copy_from_slice(&self.time.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    pub fn deserialize(reader: &mut Reader) -> Result<Self> {
        Ok(BlockHeader {
            version: reader.read_i32_le()?,
            prev_block_hash: reader.read_hash()?,
            merkle_root: reader.read_hash()?,
            time: reader.read_u32_le()?,
            bits: reader.read_u32_le()?,
            nonce: reader.read_u32_le()?,
        })
    }
}

/// One template transaction as delivered by the node: hex payload plus the
/// identifiers and fee the selector works with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxData {
    pub hex_data: String,
    pub txid: Hash,
    /// The wtxid reported by the node; equals `txid` for non-SegWit
    /// transactions.
    pub witness_hash: Hash,
    pub fee: i64,
}

/// A serialized coinbase transaction with the byte positions miners mutate
/// in place.
///
/// `extra_nonce_offset` points at a reserved region of
/// `fixed_extra_nonce_size + mutable_extra_nonce_size` zero bytes inside the
/// coinbase scriptSig; `extra_data_offset` points at the start of the
/// caller-supplied extra-data region. Both are absolute positions inside
/// `data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinbaseTx {
    pub data: ByteString,
    pub extra_data_offset: usize,
    pub extra_nonce_offset: usize,
}
