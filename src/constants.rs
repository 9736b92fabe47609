//! Script opcodes and protocol constants shared across the assembler

/// OP_0: push empty value
pub const OP_0: u8 = 0x00;

/// OP_RETURN: mark output as unspendable data carrier
pub const OP_RETURN: u8 = 0x6A;

/// OP_DUP: duplicate top stack item
pub const OP_DUP: u8 = 0x76;

/// OP_EQUAL: byte-wise equality check
pub const OP_EQUAL: u8 = 0x87;

/// OP_EQUALVERIFY: equality check that fails the script on mismatch
pub const OP_EQUALVERIFY: u8 = 0x88;

/// OP_HASH160: SHA-256 followed by RIPEMD-160
pub const OP_HASH160: u8 = 0xA9;

/// OP_CHECKSIG: signature check
pub const OP_CHECKSIG: u8 = 0xAC;

/// 4-byte magic prefix identifying a witness commitment output script
pub const WITNESS_COMMITMENT_HEADER: [u8; 4] = [0xaa, 0x21, 0xa9, 0xed];

/// Witness reserved value carried in the coinbase input witness: 32 zero bytes
pub const WITNESS_RESERVED_VALUE: [u8; 32] = [0u8; 32];

/// Full witness commitment script size: OP_RETURN + push-36 + header + hash
pub const WITNESS_COMMITMENT_SCRIPT_SIZE: usize = 38;

/// Serialized size of a block header
pub const HEADER_SIZE: usize = 80;

/// Previous-output index marking a coinbase input
pub const COINBASE_PREVOUT_INDEX: u32 = 0xffff_ffff;

/// Sequence number for final transaction
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// SegWit serialization marker byte (zero input count in legacy terms)
pub const SEGWIT_MARKER: u8 = 0x00;

/// SegWit serialization flag byte
pub const SEGWIT_FLAG: u8 = 0x01;

/// Compact encoding of the difficulty-1 target
pub const DIFF1_BITS: u32 = 0x1d00_ffff;

/// Size of a hash-160 payout address
pub const ADDRESS_SIZE: usize = 20;
