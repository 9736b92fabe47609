//! The Stratum edge of the assembler: submit parsing and notify payloads
//!
//! Message framing and session management live in the front-end; this module
//! only fixes the shapes the core consumes and produces.

use serde_json::{json, Value};

use crate::config::MiningConfig;
use crate::error::{AssemblyError, Result};
use crate::types::{BlockHeader, CoinbaseTx, Hash};

/// A parsed `mining.submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratumSubmit {
    pub worker_name: String,
    pub job_id: String,
    pub extra_nonce2: Vec<u8>,
    pub time: u32,
    pub nonce: u32,
    /// Version bits for ASIC-boost rolling, when the worker negotiated it
    pub version_bits: Option<u32>,
}

fn submit_error(message: impl Into<String>) -> AssemblyError {
    AssemblyError::MalformedSubmit(message.into())
}

fn param_str<'a>(params: &'a [Value], index: usize, name: &str) -> Result<&'a str> {
    params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| submit_error(format!("missing or mistyped parameter '{name}'")))
}

fn param_u32(params: &[Value], index: usize, name: &str) -> Result<u32> {
    let text = param_str(params, index, name)?;
    u32::from_str_radix(text, 16)
        .map_err(|_| submit_error(format!("parameter '{name}' is not a hex u32: '{text}'")))
}

impl StratumSubmit {
    /// Parse the params array of a `mining.submit` message:
    /// `[worker, job_id, extranonce2, ntime, nonce, (version_bits)]`,
    /// numeric fields hex-encoded.
    pub fn from_params(params: &Value) -> Result<Self> {
        let params = params
            .as_array()
            .ok_or_else(|| submit_error("params is not an array"))?;

        let extra_nonce2 = hex::decode(param_str(params, 2, "extranonce2")?)
            .map_err(|e| submit_error(format!("invalid extranonce2 hex: {e}")))?;
        let version_bits = match params.get(5) {
            Some(_) => Some(param_u32(params, 5, "version_bits")?),
            None => None,
        };

        Ok(StratumSubmit {
            worker_name: param_str(params, 0, "worker_name")?.to_string(),
            job_id: param_str(params, 1, "job_id")?.to_string(),
            extra_nonce2,
            time: param_u32(params, 3, "ntime")?,
            nonce: param_u32(params, 4, "nonce")?,
            version_bits,
        })
    }
}

/// Previous-block hash in notify notation: eight 32-bit words, each written
/// big-endian, in little-endian word order.
fn prevhash_notify_hex(hash: &Hash) -> String {
    let mut out = String::with_capacity(64);
    for word in hash.chunks(4) {
        let mut swapped = [0u8; 4];
        for (i, byte) in word.iter().rev().enumerate() {
            swapped[i] = *byte;
        }
        out.push_str(&hex::encode(swapped));
    }
    out
}

/// Assemble a `mining.notify` message.
///
/// The legacy coinbase is split at the extranonce region: miners reassemble
/// it as `coinb1 ‖ extranonce1 ‖ extranonce2 ‖ coinb2`. Merkle path entries
/// are sent as plain hex of their internal byte order.
pub fn build_notify(
    job_id: &str,
    header: &BlockHeader,
    job_version: u32,
    legacy: &CoinbaseTx,
    merkle_path: &[Hash],
    cfg: &MiningConfig,
    clean_jobs: bool,
) -> Value {
    let extra_nonce_size =
        cfg.fixed_extra_nonce_size as usize + cfg.mutable_extra_nonce_size as usize;
    let coinb1 = hex::encode(&legacy.data[..legacy.extra_nonce_offset]);
    let coinb2 = hex::encode(&legacy.data[legacy.extra_nonce_offset + extra_nonce_size..]);
    let branches: Vec<String> = merkle_path.iter().map(hex::encode).collect();

    json!({
        "id": null,
        "method": "mining.notify",
        "params": [
            job_id,
            prevhash_notify_hex(&header.prev_block_hash),
            coinb1,
            coinb2,
            branches,
            format!("{job_version:08x}"),
            format!("{:08x}", header.bits),
            format!("{:08x}", header.time),
            clean_jobs,
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_parsing() {
        let params = json!([
            "worker.1",
            "ab12",
            "deadbeef",
            "5f000000",
            "00a1b2c3",
            "20000000",
        ]);
        let submit = StratumSubmit::from_params(&params).unwrap();

        assert_eq!(submit.worker_name, "worker.1");
        assert_eq!(submit.job_id, "ab12");
        assert_eq!(submit.extra_nonce2, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(submit.time, 0x5f000000);
        assert_eq!(submit.nonce, 0x00a1b2c3);
        assert_eq!(submit.version_bits, Some(0x20000000));
    }

    #[test]
    fn test_submit_without_version_bits() {
        let params = json!(["w", "1", "00000000", "5f000000", "00000001"]);
        let submit = StratumSubmit::from_params(&params).unwrap();
        assert_eq!(submit.version_bits, None);
    }

    #[test]
    fn test_submit_rejects_short_params() {
        let params = json!(["w", "1", "00000000"]);
        assert!(StratumSubmit::from_params(&params).is_err());
        assert!(StratumSubmit::from_params(&json!({})).is_err());
    }

    #[test]
    fn test_submit_rejects_bad_hex() {
        let params = json!(["w", "1", "zz", "5f000000", "00000001"]);
        assert!(StratumSubmit::from_params(&params).is_err());
    }

    #[test]
    fn test_prevhash_notify_hex_swaps_words() {
        let mut hash = [0u8; 32];
        hash[0] = 0x01;
        hash[1] = 0x02;
        hash[2] = 0x03;
        hash[3] = 0x04;
        let text = prevhash_notify_hex(&hash);
        assert_eq!(text.len(), 64);
        assert!(text.starts_with("04030201"));
    }

    #[test]
    fn test_notify_splits_coinbase_around_extranonce() {
        let cfg = MiningConfig {
            tx_num_limit: 0,
            fixed_extra_nonce_size: 2,
            mutable_extra_nonce_size: 2,
        };
        let legacy = CoinbaseTx {
            data: vec![0xaa, 0xbb, 0x00, 0x00, 0x00, 0x00, 0xcc, 0xdd],
            extra_data_offset: 0,
            extra_nonce_offset: 2,
        };
        let header = BlockHeader {
            version: 0x20000000,
            prev_block_hash: [0; 32],
            merkle_root: [0; 32],
            time: 0x5f5e100f,
            bits: 0x170b2c70,
            nonce: 0,
        };

        let notify = build_notify("1", &header, 0x20000000, &legacy, &[[0x11; 32]], &cfg, true);
        let params = notify["params"].as_array().unwrap();

        assert_eq!(params[2], json!("aabb"));
        assert_eq!(params[3], json!("ccdd"));
        assert_eq!(params[4], json!(["11".repeat(32)]));
        assert_eq!(params[5], json!("20000000"));
        assert_eq!(params[6], json!("170b2c70"));
        assert_eq!(params[7], json!("5f5e100f"));
        assert_eq!(params[8], json!(true));
    }
}
