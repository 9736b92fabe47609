//! Compact targets, difficulty, and share-difficulty arithmetic

use crate::constants::DIFF1_BITS;
use crate::types::Hash;

/// 256-bit integer for target calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U256([u64; 4]); // 4 * 64 = 256 bits, little-endian words

impl U256 {
    pub fn zero() -> Self {
        U256([0; 4])
    }

    pub fn from_u32(value: u32) -> Self {
        U256([value as u64, 0, 0, 0])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&word| word == 0)
    }

    pub fn from_le_bytes(bytes: &[u8; 32]) -> Self {
        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().enumerate() {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
            *word = u64::from_le_bytes(buf);
        }
        U256(words)
    }

    pub fn shl(&self, shift: u32) -> Self {
        if shift >= 256 {
            return U256::zero();
        }
        let mut result = U256::zero();
        let word_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;
        for i in 0..4 {
            if i + word_shift < 4 {
                result.0[i + word_shift] |= self.0[i] << bit_shift;
                if bit_shift > 0 && i + word_shift + 1 < 4 {
                    result.0[i + word_shift + 1] |= self.0[i] >> (64 - bit_shift);
                }
            }
        }
        result
    }

    pub fn shr(&self, shift: u32) -> Self {
        if shift >= 256 {
            return U256::zero();
        }
        let mut result = U256::zero();
        let word_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;
        for i in 0..4 {
            if i >= word_shift {
                result.0[i - word_shift] |= self.0[i] >> bit_shift;
                if bit_shift > 0 && i - word_shift >= 1 {
                    result.0[i - word_shift - 1] |= self.0[i] << (64 - bit_shift);
                }
            }
        }
        result
    }

    /// Lossy conversion for share-difficulty ratios.
    pub fn to_f64(&self) -> f64 {
        self.0
            .iter()
            .enumerate()
            .map(|(i, &word)| word as f64 * 2f64.powi(64 * i as i32))
            .sum()
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        for (a, b) in self.0.iter().rev().zip(other.0.iter().rev()) {
            match a.cmp(b) {
                std::cmp::Ordering::Equal => continue,
                other => return other,
            }
        }
        std::cmp::Ordering::Equal
    }
}

/// Expand a compact-encoded target.
///
/// The compact format is `0x1d00ffff`-style: one exponent byte followed by a
/// 24-bit mantissa, target = mantissa × 256^(exponent − 3). A zero or
/// negative mantissa (sign bit 0x00800000) expands to zero, as does an
/// exponent that would shift past 256 bits.
pub fn expand_compact(bits: u32) -> U256 {
    let exponent = (bits >> 24) & 0xff;
    if bits & 0x0080_0000 != 0 {
        return U256::zero();
    }
    let mantissa = U256::from_u32(bits & 0x007f_ffff);
    if exponent <= 3 {
        mantissa.shr(8 * (3 - exponent))
    } else {
        mantissa.shl(8 * (exponent - 3))
    }
}

/// Block difficulty from the compact target.
///
/// Starts from `0xffff / mantissa` and scales by powers of 256 until the
/// exponent reaches 29, the difficulty-1 exponent.
pub fn get_difficulty(bits: u32) -> f64 {
    let mut shift = ((bits >> 24) & 0xff) as i32;
    let mut diff = 0x0000ffff as f64 / (bits & 0x00ff_ffff) as f64;
    while shift < 29 {
        diff *= 256.0;
        shift += 1;
    }
    while shift > 29 {
        diff /= 256.0;
        shift -= 1;
    }
    diff
}

/// True when the proof-of-work hash meets the compact target.
pub fn meets_target(pow_hash: &Hash, bits: u32) -> bool {
    U256::from_le_bytes(pow_hash) <= expand_compact(bits)
}

/// Difficulty actually met by a proof-of-work hash:
/// `diff1_target / hash`, scaled by the chain's difficulty factor.
pub fn share_difficulty(pow_hash: &Hash, difficulty_factor: f64) -> f64 {
    let hash = U256::from_le_bytes(pow_hash);
    if hash.is_zero() {
        return f64::MAX;
    }
    expand_compact(DIFF1_BITS).to_f64() / hash.to_f64() * difficulty_factor
}
