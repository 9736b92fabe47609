//! The live binding of one block template to mutable mining state

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::{debug, info};

use crate::chain::Chain;
use crate::codec::{hash_from_hex, write_compact_size};
use crate::coinbase::{build_coinbase, CoinbaseContext};
use crate::config::{MiningConfig, WorkerConfig};
use crate::constants::ADDRESS_SIZE;
use crate::error::{AssemblyError, Result};
use crate::merkle::{coinbase_merkle_path, merkle_root_from_path, sha256d};
use crate::pow::get_difficulty;
use crate::segwit::{is_segwit_enabled, witness_commitment};
use crate::selector::{transaction_checker, transaction_filter};
use crate::stratum::{build_notify, StratumSubmit};
use crate::types::{BlockHeader, CoinbaseTx, Hash, TxData, NULL_HASH};

/// Lifecycle of a [`Work`].
///
/// `New → Loaded → Mutated* → Submitting → (Accepted | Rejected)`.
/// Only `Loaded` and `Mutated` may serve notifications; `Submitting` is
/// transient while a share is being grafted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkState {
    New,
    Loaded,
    Mutated,
    Submitting,
    Accepted,
    Rejected,
}

/// One block template bound to a header, coinbase, and Merkle path.
///
/// A `Work` is owned by a single stratum session: it is created once per
/// template, refreshed with [`Work::mutate`], patched per share with
/// [`Work::prepare_for_submit`], and either discarded on the next template
/// or serialized with [`Work::build_block`] on a winning share.
pub struct Work {
    chain: Chain,
    cfg: MiningConfig,
    work_id: u64,
    mining_address: [u8; ADDRESS_SIZE],
    coinbase_message: Vec<u8>,
    initialized: bool,
    state: WorkState,

    pub header: BlockHeader,
    /// Template version snapshot, the base for ASIC-boost version rolling
    pub job_version: u32,
    pub segwit_enabled: bool,
    pub merkle_path: Vec<Hash>,
    pub coinbase_legacy: CoinbaseTx,
    pub coinbase_witness: CoinbaseTx,
    pub witness_commitment: Vec<u8>,
    pub height: u64,
    pub block_reward: i64,
    pub dev_fee: i64,
    pub dev_script: Vec<u8>,
    /// Concatenated hex payloads of the selected transactions
    pub tx_hex_data: String,
    pub tx_count: usize,
    notify_payload: Option<Value>,
}

fn template_error(message: impl Into<String>) -> AssemblyError {
    AssemblyError::MalformedTemplate(message.into())
}

fn require<'a>(object: &'a Value, key: &str) -> Result<&'a Value> {
    object
        .get(key)
        .ok_or_else(|| template_error(format!("missing field '{key}'")))
}

fn require_u64(object: &Value, key: &str) -> Result<u64> {
    require(object, key)?
        .as_u64()
        .ok_or_else(|| template_error(format!("field '{key}' is not an unsigned integer")))
}

fn require_i64(object: &Value, key: &str) -> Result<i64> {
    require(object, key)?
        .as_i64()
        .ok_or_else(|| template_error(format!("field '{key}' is not an integer")))
}

fn require_str<'a>(object: &'a Value, key: &str) -> Result<&'a str> {
    require(object, key)?
        .as_str()
        .ok_or_else(|| template_error(format!("field '{key}' is not a string")))
}

fn parse_template_transactions(raw: &[Value]) -> Result<Vec<TxData>> {
    raw.iter()
        .enumerate()
        .map(|(index, tx)| {
            let context = |e: AssemblyError| template_error(format!("transaction {index}: {e}"));
            let txid = hash_from_hex(require_str(tx, "txid").map_err(context)?).map_err(context)?;
            let witness_hash = match tx.get("hash").and_then(Value::as_str) {
                Some(text) => hash_from_hex(text).map_err(context)?,
                None => txid,
            };
            Ok(TxData {
                hex_data: require_str(tx, "data").map_err(context)?.to_ascii_lowercase(),
                txid,
                witness_hash,
                fee: require_i64(tx, "fee").map_err(context)?,
            })
        })
        .collect()
}

/// FreeCash templates carry an explicit dev-reward output description.
fn process_coinbase_dev_reward(
    template: &Value,
    dev_fee: &mut i64,
    dev_script: &mut Vec<u8>,
) -> Result<()> {
    let Some(reward) = template.get("coinbasedevreward") else {
        return Ok(());
    };
    *dev_fee = require_i64(reward, "value")?;
    *dev_script = hex::decode(require_str(reward, "scriptpubkey")?)
        .map_err(|e| template_error(format!("invalid coinbasedevreward scriptpubkey: {e}")))?;
    Ok(())
}

/// BCHA templates redirect part of the reward to the miner fund address.
fn process_miner_fund(
    template: &Value,
    block_reward: &mut i64,
    dev_fee: &mut i64,
    dev_script: &mut Vec<u8>,
) -> Result<()> {
    let Some(fund) = template.get("minerfund") else {
        return Ok(());
    };
    let minimum = require_i64(fund, "minimumvalue")?;
    let address = fund
        .get("addresses")
        .and_then(Value::as_array)
        .and_then(|addresses| addresses.first())
        .and_then(Value::as_str)
        .ok_or_else(|| template_error("minerfund carries no addresses"))?;
    *dev_fee = minimum;
    *block_reward -= minimum;
    *dev_script = crate::address::cashaddr_to_script(address)?;
    Ok(())
}

impl Work {
    /// Create an empty work slot for one chain and payout address.
    ///
    /// A payout address of the wrong size leaves the work uninitialized:
    /// loading still succeeds so the session can report a sensible error,
    /// but [`Work::ready`] stays false and no notification is served.
    pub fn new(
        work_id: u64,
        chain: Chain,
        cfg: MiningConfig,
        mining_address: &[u8],
        coinbase_message: &str,
    ) -> Self {
        let initialized = mining_address.len() == ADDRESS_SIZE;
        let mut address = [0u8; ADDRESS_SIZE];
        if initialized {
            address.copy_from_slice(mining_address);
        }
        Work {
            chain,
            cfg,
            work_id,
            mining_address: address,
            coinbase_message: coinbase_message.as_bytes().to_vec(),
            initialized,
            state: WorkState::New,
            header: BlockHeader {
                version: 0,
                prev_block_hash: NULL_HASH,
                merkle_root: NULL_HASH,
                time: 0,
                bits: 0,
                nonce: 0,
            },
            job_version: 0,
            segwit_enabled: false,
            merkle_path: Vec::new(),
            coinbase_legacy: CoinbaseTx::default(),
            coinbase_witness: CoinbaseTx::default(),
            witness_commitment: Vec::new(),
            height: 0,
            block_reward: 0,
            dev_fee: 0,
            dev_script: Vec::new(),
            tx_hex_data: String::new(),
            tx_count: 0,
            notify_payload: None,
        }
    }

    pub fn state(&self) -> WorkState {
        self.state
    }

    /// True once a template is loaded for a correctly-sized payout address.
    pub fn ready(&self) -> bool {
        self.initialized && matches!(self.state, WorkState::Loaded | WorkState::Mutated)
    }

    pub fn can_notify(&self) -> bool {
        matches!(self.state, WorkState::Loaded | WorkState::Mutated)
    }

    pub fn job_id(&self) -> String {
        format!("{:016x}", self.work_id)
    }

    /// Bind a `getblocktemplate` response to this work.
    ///
    /// Validates the required fields, runs transaction selection, applies
    /// the dev-reward and miner-fund grafts, computes the witness commitment
    /// when SegWit is active, builds both coinbase forms, and seeds the
    /// header. The Merkle root stays null: it is recomputed per share from
    /// the mutated coinbase and the stored path.
    pub fn load_from_template(&mut self, document: &Value) -> Result<()> {
        // A failed load must not leave a previously loaded template looking
        // serviceable
        self.state = WorkState::New;
        self.notify_payload = None;

        let template = document
            .get("result")
            .filter(|v| v.is_object())
            .ok_or_else(|| template_error("no result object"))?;

        self.height = require_u64(template, "height")?;
        let version = require_u64(template, "version")?;
        if version > u32::MAX as u64 {
            return Err(template_error("field 'version' exceeds 32 bits"));
        }
        let prev_block_hash = hash_from_hex(require_str(template, "previousblockhash")?)?;
        let curtime = require_u64(template, "curtime")?;
        let bits_text = require_str(template, "bits")?;
        let bits = u32::from_str_radix(bits_text, 16)
            .map_err(|_| template_error(format!("field 'bits' is not a hex u32: '{bits_text}'")))?;
        let coinbase_value = require_i64(template, "coinbasevalue")?;
        self.block_reward = coinbase_value;
        let raw_transactions = require(template, "transactions")?
            .as_array()
            .ok_or_else(|| template_error("field 'transactions' is not an array"))?;

        let transactions = parse_template_transactions(raw_transactions)?;
        self.segwit_enabled = is_segwit_enabled(&transactions);

        let tx_limit = self.cfg.tx_num_limit as usize;
        let tx_filter = tx_limit > 0 && transactions.len() > tx_limit;
        let selected = if tx_filter {
            transaction_filter(
                &transactions,
                tx_limit,
                &mut self.block_reward,
                self.chain.sorts_txids(),
            )
        } else {
            transaction_checker(&transactions)?
        };

        self.dev_fee = 0;
        self.dev_script.clear();
        process_coinbase_dev_reward(template, &mut self.dev_fee, &mut self.dev_script)?;
        process_miner_fund(
            template,
            &mut self.block_reward,
            &mut self.dev_fee,
            &mut self.dev_script,
        )?;

        if tx_filter {
            info!(
                ticker = self.chain.ticker(),
                height = self.height,
                "transaction filter: {} -> {} transactions, coinbase value {} -> {}",
                transactions.len(),
                selected.len(),
                coinbase_value,
                self.block_reward,
            );
        }

        self.witness_commitment = if self.segwit_enabled {
            witness_commitment(
                template
                    .get("default_witness_commitment")
                    .and_then(Value::as_str),
                tx_filter,
                &selected,
            )?
        } else {
            Vec::new()
        };

        self.header = BlockHeader {
            version: version as u32 as i32,
            prev_block_hash,
            merkle_root: NULL_HASH,
            time: curtime as u32,
            bits,
            nonce: 0,
        };
        self.job_version = version as u32;

        let context = CoinbaseContext {
            height: self.height,
            block_reward: self.block_reward,
            mining_address: &self.mining_address,
            coinbase_message: &self.coinbase_message,
            coinbase_extra: &[],
            dev_fee: self.dev_fee,
            dev_script: &self.dev_script,
            segwit_enabled: self.segwit_enabled,
            witness_commitment: &self.witness_commitment,
        };
        let (legacy, witness) = build_coinbase(&context, &self.cfg)?;
        self.coinbase_legacy = legacy;
        self.coinbase_witness = witness;

        self.tx_count = selected.len();
        self.merkle_path = coinbase_merkle_path(
            &selected.iter().map(|tx| tx.txid).collect::<Vec<Hash>>(),
        );
        self.tx_hex_data = selected.iter().map(|tx| tx.hex_data.as_str()).collect();

        self.state = WorkState::Loaded;
        self.rebuild_notify(true);
        debug!(
            ticker = self.chain.ticker(),
            height = self.height,
            segwit = self.segwit_enabled,
            transactions = self.tx_count,
            "template loaded"
        );
        Ok(())
    }

    /// Refresh `nTime` to the wall clock and regenerate the notify payload.
    pub fn mutate(&mut self) {
        if !self.can_notify() {
            debug!("mutate called on work without a template");
            return;
        }
        self.header.time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs() as u32);
        self.state = WorkState::Mutated;
        self.rebuild_notify(true);
    }

    /// Regenerate the notify payload, optionally telling miners to drop
    /// in-flight work on the previous job.
    pub fn build_notify_payload(&mut self, clean_jobs: bool) {
        if self.can_notify() {
            self.rebuild_notify(clean_jobs);
        }
    }

    fn rebuild_notify(&mut self, clean_jobs: bool) {
        self.notify_payload = Some(build_notify(
            &self.job_id(),
            &self.header,
            self.job_version,
            &self.coinbase_legacy,
            &self.merkle_path,
            &self.cfg,
            clean_jobs,
        ));
    }

    pub fn notify_payload(&self) -> Option<&Value> {
        self.notify_payload.as_ref()
    }

    /// Graft a worker's share into the bound state: write the extranonce
    /// into both coinbase forms at the recorded offsets, merge the
    /// miner-supplied time, nonce, and rolled version bits, and recompute
    /// the Merkle root from the mutated coinbase and the stored path.
    pub fn prepare_for_submit(
        &mut self,
        worker: &WorkerConfig,
        submit: &StratumSubmit,
    ) -> Result<()> {
        if matches!(self.state, WorkState::New) {
            return Err(AssemblyError::MalformedSubmit(
                "no template loaded".into(),
            ));
        }
        if !self.initialized {
            return Err(AssemblyError::AddressMismatch(
                "payout address size does not match the chain".into(),
            ));
        }
        let fixed = self.cfg.fixed_extra_nonce_size as usize;
        let mutable = self.cfg.mutable_extra_nonce_size as usize;
        if worker.extra_nonce_fixed.len() != fixed {
            return Err(AssemblyError::MalformedSubmit(format!(
                "worker extranonce is {} bytes, expected {fixed}",
                worker.extra_nonce_fixed.len()
            )));
        }
        if submit.extra_nonce2.len() != mutable {
            return Err(AssemblyError::MalformedSubmit(format!(
                "extranonce2 is {} bytes, expected {mutable}",
                submit.extra_nonce2.len()
            )));
        }

        self.state = WorkState::Submitting;
        for coinbase in [&mut self.coinbase_legacy, &mut self.coinbase_witness] {
            let start = coinbase.extra_nonce_offset;
            coinbase.data[start..start + fixed].copy_from_slice(&worker.extra_nonce_fixed);
            coinbase.data[start + fixed..start + fixed + mutable]
                .copy_from_slice(&submit.extra_nonce2);
        }

        self.header.time = submit.time;
        self.header.nonce = submit.nonce;
        self.header.version = match submit.version_bits {
            Some(bits) => {
                ((self.job_version & !worker.version_mask) | (bits & worker.version_mask)) as i32
            }
            None => self.job_version as i32,
        };

        let coinbase_txid = sha256d(&self.coinbase_legacy.data);
        self.header.merkle_root = merkle_root_from_path(&coinbase_txid, &self.merkle_path);
        Ok(())
    }

    /// Record the backend's verdict on the submitted share.
    pub fn complete_submit(&mut self, accepted: bool) {
        self.state = if accepted {
            WorkState::Accepted
        } else {
            WorkState::Rejected
        };
    }

    /// Check the bound header against its target; returns the verdict and
    /// the share difficulty actually met.
    pub fn check_consensus(&self) -> (bool, f64) {
        self.chain.check_consensus(&self.header)
    }

    /// Serialize the full block:
    /// `header ‖ CompactSize(tx_count + 1) ‖ witness coinbase ‖ transactions`,
    /// lowercase hex, ready for `submitblock`.
    pub fn build_block(&self) -> String {
        let mut prefix = Vec::with_capacity(89);
        prefix.extend_from_slice(&self.header.serialize());
        write_compact_size(&mut prefix, self.tx_count as u64 + 1);

        let mut block = String::with_capacity(
            (prefix.len() + self.coinbase_witness.data.len()) * 2 + self.tx_hex_data.len(),
        );
        block.push_str(&hex::encode(&prefix));
        block.push_str(&hex::encode(&self.coinbase_witness.data));
        block.push_str(&self.tx_hex_data);
        block
    }

    /// Network difficulty of the bound template.
    pub fn expected_work(&self) -> f64 {
        get_difficulty(self.header.bits)
    }

    /// Display hash of the current header.
    pub fn share_hash(&self) -> Hash {
        self.chain.display_hash(&self.header)
    }

    /// Display hash of the current header, in hex.
    pub fn block_hash(&self) -> String {
        crate::codec::hash_to_hex(&self.share_hash())
    }

    /// Rough profitability of this work: block reward per unit of expected
    /// difficulty, scaled by a price and an arbitrary coefficient.
    pub fn profit_estimate(&self, price: f64, coeff: f64) -> f64 {
        price * self.block_reward as f64 / self.expected_work() * coeff
    }
}
