//! Pool-side configuration consumed by the assembler

use serde::{Deserialize, Serialize};

/// Knobs controlling template assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Maximum number of non-coinbase transactions per block; 0 disables
    /// filtering.
    pub tx_num_limit: u32,
    /// Bytes of the extranonce region owned by the pool (per-session value).
    pub fixed_extra_nonce_size: u8,
    /// Bytes of the extranonce region rolled by the miner.
    pub mutable_extra_nonce_size: u8,
}

impl Default for MiningConfig {
    fn default() -> Self {
        MiningConfig {
            tx_num_limit: 0,
            fixed_extra_nonce_size: 8,
            mutable_extra_nonce_size: 8,
        }
    }
}

/// Per-connection worker state read at submit time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// The session's fixed extranonce bytes, sized
    /// `MiningConfig::fixed_extra_nonce_size`.
    pub extra_nonce_fixed: Vec<u8>,
    /// Version-rolling mask granted to the worker; 0 disables rolling.
    pub version_mask: u32,
}
