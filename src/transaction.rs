//! Transaction serialization in legacy and witness forms

use crate::codec::{compact_size_len, write_compact_size, Reader};
use crate::constants::{SEGWIT_FLAG, SEGWIT_MARKER};
use crate::error::{AssemblyError, Result};
use crate::merkle::sha256d;
use crate::types::{Hash, Transaction, TxIn, TxOut};

impl Transaction {
    /// True when any input carries witness data.
    pub fn has_witness_data(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness_stack.is_empty())
    }

    /// Serialize the transaction.
    ///
    /// Legacy form:
    /// `version ‖ CompactSize(|inputs|) ‖ inputs ‖ CompactSize(|outputs|) ‖
    /// outputs ‖ lock_time`. The witness form inserts the 0x00/0x01
    /// marker/flag pair after the version and appends one witness stack per
    /// input before the lock time. A transaction without witness data always
    /// serializes in legacy form, so both forms stay byte-identical for it.
    pub fn serialize(&self, with_witness: bool) -> Vec<u8> {
        let with_witness = with_witness && self.has_witness_data();
        let mut out = Vec::new();

        out.extend_from_slice(&self.version.to_le_bytes());
        if with_witness {
            out.push(SEGWIT_MARKER);
            out.push(SEGWIT_FLAG);
        }

        write_compact_size(&mut out, self.inputs.len() as u64);
        for input in &self.inputs {
            out.extend_from_slice(&input.previous_output_hash);
            out.extend_from_slice(&input.previous_output_index.to_le_bytes());
            write_compact_size(&mut out, input.script_sig.len() as u64);
            out.extend_from_slice(&input.script_sig);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }

        write_compact_size(&mut out, self.outputs.len() as u64);
        for output in &self.outputs {
            out.extend_from_slice(&output.value.to_le_bytes());
            write_compact_size(&mut out, output.pk_script.len() as u64);
            out.extend_from_slice(&output.pk_script);
        }

        if with_witness {
            for input in &self.inputs {
                write_compact_size(&mut out, input.witness_stack.len() as u64);
                for item in &input.witness_stack {
                    write_compact_size(&mut out, item.len() as u64);
                    out.extend_from_slice(item);
                }
            }
        }

        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    /// Deserialize a transaction from a reader, accepting both forms.
    pub fn deserialize(reader: &mut Reader) -> Result<Self> {
        let version = reader.read_i32_le()?;

        let mut input_count = reader.read_compact_size()?;
        let mut segwit = false;
        if input_count == 0 {
            // Legacy transactions cannot have zero inputs; this is the
            // witness marker followed by the flag byte.
            let flag = reader.read_u8()?;
            if flag != SEGWIT_FLAG {
                return Err(AssemblyError::MalformedTransaction(format!(
                    "invalid witness flag byte 0x{flag:02x}"
                )));
            }
            segwit = true;
            input_count = reader.read_compact_size()?;
        }

        let mut inputs = Vec::with_capacity(input_count.min(1024) as usize);
        for _ in 0..input_count {
            let previous_output_hash = reader.read_hash()?;
            let previous_output_index = reader.read_u32_le()?;
            let script_len = reader.read_compact_size()? as usize;
            let script_sig = reader.take(script_len)?.to_vec();
            let sequence = reader.read_u32_le()?;
            inputs.push(TxIn {
                previous_output_hash,
                previous_output_index,
                script_sig,
                sequence,
                witness_stack: Vec::new(),
            });
        }

        let output_count = reader.read_compact_size()?;
        let mut outputs = Vec::with_capacity(output_count.min(1024) as usize);
        for _ in 0..output_count {
            let value = reader.read_i64_le()?;
            let script_len = reader.read_compact_size()? as usize;
            let pk_script = reader.take(script_len)?.to_vec();
            outputs.push(TxOut { value, pk_script });
        }

        if segwit {
            for input in &mut inputs {
                let item_count = reader.read_compact_size()?;
                let mut stack = Vec::with_capacity(item_count.min(1024) as usize);
                for _ in 0..item_count {
                    let item_len = reader.read_compact_size()? as usize;
                    stack.push(reader.take(item_len)?.to_vec());
                }
                input.witness_stack = stack;
            }
        }

        let lock_time = reader.read_u32_le()?;
        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    /// Deserialize from raw bytes; trailing bytes are an error.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let tx = Self::deserialize(&mut reader)?;
        if !reader.is_empty() {
            return Err(AssemblyError::MalformedTransaction(format!(
                "{} trailing bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize from a hex payload; trailing bytes are an error.
    pub fn from_hex(data: &str) -> Result<Self> {
        let bytes = hex::decode(data)
            .map_err(|e| AssemblyError::MalformedTransaction(format!("invalid hex: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Transaction id: SHA-256d over the legacy serialization.
    pub fn txid(&self) -> Hash {
        sha256d(&self.serialize(false))
    }

    /// Witness transaction id: SHA-256d over the witness serialization.
    pub fn wtxid(&self) -> Hash {
        sha256d(&self.serialize(true))
    }

    /// Byte position of the first input's scriptSig content (after its
    /// CompactSize length prefix) within the serialization of the requested
    /// form. Returns `None` for a transaction without inputs.
    pub fn first_script_sig_offset(&self, with_witness: bool) -> Option<usize> {
        let first = self.inputs.first()?;
        let mut offset = 4;
        if with_witness && self.has_witness_data() {
            offset += 2;
        }
        offset += compact_size_len(self.inputs.len() as u64);
        offset += 32 + 4;
        offset += compact_size_len(first.script_sig.len() as u64);
        Some(offset)
    }
}
