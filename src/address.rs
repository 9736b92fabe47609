//! Cashaddr decoding for miner-fund payout scripts

use crate::constants::{OP_CHECKSIG, OP_DUP, OP_EQUAL, OP_EQUALVERIFY, OP_HASH160};
use crate::error::{AssemblyError, Result};

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

const DEFAULT_PREFIX: &str = "bitcoincash";

/// Hash sizes selectable by the low 3 bits of the version byte, in bytes.
const HASH_SIZES: [usize; 8] = [20, 24, 28, 32, 40, 48, 56, 64];

fn malformed(message: String) -> AssemblyError {
    AssemblyError::MalformedTemplate(message)
}

/// BCH base32 checksum over 5-bit values.
fn polymod(values: &[u8]) -> u64 {
    let mut checksum: u64 = 1;
    for &value in values {
        let top = (checksum >> 35) as u8;
        checksum = ((checksum & 0x07_ffff_ffff) << 5) ^ value as u64;
        if top & 0x01 != 0 {
            checksum ^= 0x98_f2bc_8e61;
        }
        if top & 0x02 != 0 {
            checksum ^= 0x79_b76d_99e2;
        }
        if top & 0x04 != 0 {
            checksum ^= 0xf3_3e5f_b3c4;
        }
        if top & 0x08 != 0 {
            checksum ^= 0xae_2eab_e2a8;
        }
        if top & 0x10 != 0 {
            checksum ^= 0x1e_4f43_e470;
        }
    }
    checksum ^ 1
}

/// Low 5 bits of each prefix character, followed by the zero separator.
fn expand_prefix(prefix: &str) -> Vec<u8> {
    let mut out: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
    out.push(0);
    out
}

/// Regroup 5-bit values into bytes; incomplete trailing groups must be zero
/// padding.
fn convert_bits(values: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(values.len() * 5 / 8);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    for &value in values {
        acc = (acc << 5) | value as u32;
        bits += 5;
        while bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
    }
    if bits >= 5 || (acc & ((1 << bits) - 1)) != 0 {
        return Err(malformed("invalid cashaddr padding".into()));
    }
    Ok(out)
}

/// Decode a cashaddr and build the matching output script: P2PKH for type 0,
/// P2SH for type 1. Addresses without a prefix default to `bitcoincash:`.
pub fn cashaddr_to_script(address: &str) -> Result<Vec<u8>> {
    let address = address.to_lowercase();
    let (prefix, payload) = match address.split_once(':') {
        Some((prefix, payload)) => (prefix, payload),
        None => (DEFAULT_PREFIX, address.as_str()),
    };

    let mut values = Vec::with_capacity(payload.len());
    for c in payload.bytes() {
        let value = CHARSET
            .iter()
            .position(|&ch| ch == c)
            .ok_or_else(|| malformed(format!("invalid cashaddr character '{}'", c as char)))?;
        values.push(value as u8);
    }
    if values.len() < 9 {
        return Err(malformed("cashaddr payload too short".into()));
    }

    let mut checked = expand_prefix(prefix);
    checked.extend_from_slice(&values);
    if polymod(&checked) != 0 {
        return Err(malformed("cashaddr checksum mismatch".into()));
    }

    // Strip the 8 checksum symbols, regroup to bytes
    let data = convert_bits(&values[..values.len() - 8])?;
    let (&version, hash) = data
        .split_first()
        .ok_or_else(|| malformed("empty cashaddr payload".into()))?;
    if version & 0x80 != 0 {
        return Err(malformed("reserved cashaddr version bit set".into()));
    }
    let expected_size = HASH_SIZES[(version & 0x07) as usize];
    if hash.len() != expected_size {
        return Err(malformed(format!(
            "cashaddr hash size {} does not match version byte",
            hash.len()
        )));
    }

    let kind = (version >> 3) & 0x0f;
    let mut script = Vec::with_capacity(hash.len() + 5);
    match kind {
        0 => {
            script.push(OP_DUP);
            script.push(OP_HASH160);
            script.push(hash.len() as u8);
            script.extend_from_slice(hash);
            script.push(OP_EQUALVERIFY);
            script.push(OP_CHECKSIG);
        }
        1 => {
            script.push(OP_HASH160);
            script.push(hash.len() as u8);
            script.extend_from_slice(hash);
            script.push(OP_EQUAL);
        }
        other => {
            return Err(malformed(format!("unsupported cashaddr type {other}")));
        }
    }
    Ok(script)
}
