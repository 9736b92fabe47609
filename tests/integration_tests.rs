//! End-to-end template assembly scenarios: template JSON in, block hex out.

use block_assembler::codec::{hash_to_hex, Reader};
use block_assembler::merkle::{merkle_join, sha256d};
use block_assembler::stratum::StratumSubmit;
use block_assembler::{
    BlockHeader, Chain, MiningConfig, Transaction, Work, WorkerConfig, AssemblyError,
    OP_CHECKSIG, OP_DUP, OP_RETURN, WITNESS_COMMITMENT_HEADER,
};
use serde_json::{json, Value};

const PREV_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000011";

fn minimal_template(transactions: Vec<Value>) -> Value {
    json!({
        "result": {
            "height": 700000,
            "version": 0x2000_0000u32,
            "previousblockhash": PREV_HASH,
            "curtime": 1600000000,
            "bits": "170b2c70",
            "coinbasevalue": 625_000_000i64,
            "transactions": transactions,
        }
    })
}

/// A decodable template transaction whose single input spends `parent`'s
/// declared txid. `witness_hash` differs from the txid when `witness` is set,
/// flipping SegWit detection on.
fn template_tx(id: u8, parent: Option<u8>, fee: i64, witness: bool) -> Value {
    let tx = Transaction {
        version: 1,
        inputs: vec![block_assembler::TxIn {
            previous_output_hash: match parent {
                Some(p) => [p; 32],
                None => [0xee; 32],
            },
            previous_output_index: 0,
            script_sig: vec![],
            sequence: 0xffffffff,
            witness_stack: vec![],
        }],
        outputs: vec![block_assembler::TxOut {
            value: 1000,
            pk_script: vec![0x51],
        }],
        lock_time: 0,
    };
    let txid = [id; 32];
    let witness_hash = if witness { [id ^ 0x80; 32] } else { txid };
    json!({
        "data": hex::encode(tx.serialize(false)),
        "txid": hash_to_hex(&txid),
        "hash": hash_to_hex(&witness_hash),
        "fee": fee,
    })
}

fn new_work(chain: Chain, cfg: MiningConfig) -> Work {
    Work::new(7, chain, cfg, &[0u8; 20], "/block-assembler/")
}

#[test]
fn test_minimal_btc_template() {
    let mut work = new_work(Chain::Btc, MiningConfig::default());
    work.load_from_template(&minimal_template(vec![])).unwrap();

    assert!(work.ready());
    assert!(!work.segwit_enabled);
    assert_eq!(work.height, 700000);
    assert_eq!(work.block_reward, 625_000_000);
    assert_eq!(work.header.bits, 0x170b2c70);
    assert_eq!(work.header.time, 1600000000);
    assert_eq!(work.header.merkle_root, [0u8; 32]);
    assert_eq!(hash_to_hex(&work.header.prev_block_hash), PREV_HASH);
    assert!(work.merkle_path.is_empty());

    // Single P2PKH payout carrying the whole reward, scriptSig led by the
    // BIP-34 height
    let coinbase = Transaction::from_bytes(&work.coinbase_legacy.data).unwrap();
    assert_eq!(coinbase.version, 1);
    assert_eq!(coinbase.outputs.len(), 1);
    assert_eq!(coinbase.outputs[0].value, 625_000_000);
    assert_eq!(coinbase.outputs[0].pk_script[0], OP_DUP);
    assert_eq!(coinbase.outputs[0].pk_script.last(), Some(&OP_CHECKSIG));
    assert_eq!(&coinbase.inputs[0].script_sig[..4], &[0x03, 0x60, 0xae, 0x0a]);

    // Block: header, count 1, the coinbase, nothing else
    let block = hex::decode(work.build_block()).unwrap();
    let mut reader = Reader::new(&block);
    let header = BlockHeader::deserialize(&mut reader).unwrap();
    assert_eq!(header.version, 0x2000_0000);
    assert_eq!(reader.read_compact_size().unwrap(), 1);
    let parsed = Transaction::deserialize(&mut reader).unwrap();
    assert_eq!(parsed, coinbase);
    assert!(reader.is_empty());
}

#[test]
fn test_segwit_template() {
    let mut work = new_work(Chain::Btc, MiningConfig::default());
    work.load_from_template(&minimal_template(vec![template_tx(1, None, 5000, true)]))
        .unwrap();

    assert!(work.segwit_enabled);

    let coinbase = Transaction::from_bytes(&work.coinbase_witness.data).unwrap();
    assert_eq!(coinbase.version, 2);
    // Payout plus the zero-value witness commitment
    assert_eq!(coinbase.outputs.len(), 2);
    let commitment = coinbase.outputs.last().unwrap();
    assert_eq!(commitment.value, 0);
    assert_eq!(commitment.pk_script.len(), 38);
    assert_eq!(commitment.pk_script[0], OP_RETURN);
    assert_eq!(&commitment.pk_script[2..6], &WITNESS_COMMITMENT_HEADER);

    // Coinbase input carries the 32-byte zero witness reserved value
    assert_eq!(coinbase.inputs[0].witness_stack, vec![vec![0u8; 32]]);

    // Legacy and witness forms diverge, offsets shifted by the marker pair
    assert_ne!(work.coinbase_legacy.data, work.coinbase_witness.data);
    assert_eq!(
        work.coinbase_witness.extra_nonce_offset,
        work.coinbase_legacy.extra_nonce_offset + 2
    );

    // The block embeds the witness serialization
    let block = work.build_block();
    assert!(block.contains(&hex::encode(&work.coinbase_witness.data)));
}

#[test]
fn test_all_hashes_equal_disables_segwit() {
    let mut work = new_work(Chain::Btc, MiningConfig::default());
    work.load_from_template(&minimal_template(vec![
        template_tx(1, None, 100, false),
        template_tx(2, None, 100, false),
    ]))
    .unwrap();
    assert!(!work.segwit_enabled);
    assert_eq!(work.coinbase_legacy.data, work.coinbase_witness.data);
}

#[test]
fn test_cap_filters_dependent_transactions() {
    // [A, B(dep A), C, D(dep C)] capped at 2 keeps {A, B}; fees of C and D
    // stay deducted from the reward
    let cfg = MiningConfig {
        tx_num_limit: 2,
        ..MiningConfig::default()
    };
    let mut work = new_work(Chain::Btc, cfg);
    work.load_from_template(&minimal_template(vec![
        template_tx(1, None, 100, false),
        template_tx(2, Some(1), 200, false),
        template_tx(3, None, 400, false),
        template_tx(4, Some(3), 800, false),
    ]))
    .unwrap();

    assert_eq!(work.tx_count, 2);
    assert_eq!(work.block_reward, 625_000_000 - 400 - 800);
    assert_eq!(work.merkle_path.len(), 2);
    // The payout output reflects the adjusted reward
    let coinbase = Transaction::from_bytes(&work.coinbase_legacy.data).unwrap();
    assert_eq!(coinbase.outputs[0].value, 625_000_000 - 400 - 800);
}

#[test]
fn test_fch_dev_reward() {
    let dev_script_hex = format!("76a914{}88ac", "22".repeat(20));
    let mut template = minimal_template(vec![]);
    template["result"]["coinbasedevreward"] = json!({
        "value": 10_000_000i64,
        "scriptpubkey": dev_script_hex,
    });

    let mut work = new_work(Chain::Fch, MiningConfig::default());
    work.load_from_template(&template).unwrap();

    assert_eq!(work.dev_fee, 10_000_000);
    // The dev reward is minted on top; the miner payout keeps the full
    // coinbase value
    assert_eq!(work.block_reward, 625_000_000);

    let coinbase = Transaction::from_bytes(&work.coinbase_legacy.data).unwrap();
    assert_eq!(coinbase.outputs.len(), 2);
    assert_eq!(coinbase.outputs[0].value, 625_000_000);
    assert_eq!(coinbase.outputs[1].value, 10_000_000);
    assert_eq!(hex::encode(&coinbase.outputs[1].pk_script), format!("76a914{}88ac", "22".repeat(20)));
}

#[test]
fn test_miner_fund_redirects_reward() {
    let mut template = minimal_template(vec![]);
    template["result"]["minerfund"] = json!({
        "minimumvalue": 50_000_000i64,
        "addresses": ["bitcoincash:qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekg2"],
    });

    let mut work = new_work(Chain::Bchabc, MiningConfig::default());
    work.load_from_template(&template).unwrap();

    assert_eq!(work.dev_fee, 50_000_000);
    assert_eq!(work.block_reward, 625_000_000 - 50_000_000);

    let coinbase = Transaction::from_bytes(&work.coinbase_legacy.data).unwrap();
    assert_eq!(coinbase.outputs.len(), 2);
    assert_eq!(coinbase.outputs[0].value, 625_000_000 - 50_000_000);
    assert_eq!(coinbase.outputs[1].value, 50_000_000);
    // P2PKH derived from the cashaddr
    let script = &coinbase.outputs[1].pk_script;
    assert_eq!(script.len(), 25);
    assert_eq!(script[0], OP_DUP);
    assert_eq!(script[3], 0xf5);
}

#[test]
fn test_submit_path_roundtrip() {
    let mut work = new_work(Chain::Btc, MiningConfig::default());
    work.load_from_template(&minimal_template(vec![template_tx(9, None, 100, false)]))
        .unwrap();

    let worker = WorkerConfig {
        extra_nonce_fixed: vec![0xde, 0xad, 0xbe, 0xef, 0xde, 0xad, 0xbe, 0xef],
        version_mask: 0,
    };
    let submit = StratumSubmit::from_params(&json!([
        "worker.1",
        work.job_id(),
        "0102030405060708",
        "609b1e00",
        "00c0ffee",
    ]))
    .unwrap();
    work.prepare_for_submit(&worker, &submit).unwrap();

    let block = hex::decode(work.build_block()).unwrap();
    let mut reader = Reader::new(&block);
    let header = BlockHeader::deserialize(&mut reader).unwrap();
    assert_eq!(header.time, 0x609b1e00);
    assert_eq!(header.nonce, 0x00c0ffee);
    assert_eq!(header.version, 0x2000_0000);
    assert_eq!(reader.read_compact_size().unwrap(), 2);

    // The coinbase inside the block carries the injected extranonce at the
    // recorded offset
    let coinbase_start = block.len() - reader.remaining();
    let offset = coinbase_start + work.coinbase_witness.extra_nonce_offset;
    assert_eq!(
        &block[offset..offset + 16],
        &[0xde, 0xad, 0xbe, 0xef, 0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
    );

    // Header Merkle root matches the mutated coinbase folded up the path
    let coinbase_txid = sha256d(&work.coinbase_legacy.data);
    assert_eq!(header.merkle_root, merkle_join(&coinbase_txid, &[9u8; 32]));

    // The template transaction rides along untouched
    let _coinbase = Transaction::deserialize(&mut reader).unwrap();
    let tail = Transaction::deserialize(&mut reader).unwrap();
    assert_eq!(tail.inputs[0].previous_output_hash, [0xee; 32]);
    assert!(reader.is_empty());
}

#[test]
fn test_submit_rejects_wrong_extranonce_size() {
    let mut work = new_work(Chain::Btc, MiningConfig::default());
    work.load_from_template(&minimal_template(vec![])).unwrap();

    let worker = WorkerConfig {
        extra_nonce_fixed: vec![0u8; 8],
        version_mask: 0,
    };
    let submit = StratumSubmit::from_params(&json!([
        "worker.1",
        work.job_id(),
        "0102",
        "609b1e00",
        "00c0ffee",
    ]))
    .unwrap();
    assert!(matches!(
        work.prepare_for_submit(&worker, &submit),
        Err(AssemblyError::MalformedSubmit(_))
    ));
}

#[test]
fn test_version_rolling_merges_masked_bits() {
    let mut work = new_work(Chain::Btc, MiningConfig::default());
    work.load_from_template(&minimal_template(vec![])).unwrap();

    let worker = WorkerConfig {
        extra_nonce_fixed: vec![0u8; 8],
        version_mask: 0x1fff_e000,
    };
    let submit = StratumSubmit::from_params(&json!([
        "worker.1",
        work.job_id(),
        "0000000000000000",
        "609b1e00",
        "00c0ffee",
        "1fffe000",
    ]))
    .unwrap();
    work.prepare_for_submit(&worker, &submit).unwrap();

    // Rolled bits land inside the mask; bits outside it come from the job
    assert_eq!(work.header.version as u32, 0x2000_0000 | 0x1fff_e000);
}

#[test]
fn test_notify_payload_shape() {
    let mut work = new_work(Chain::Btc, MiningConfig::default());
    work.load_from_template(&minimal_template(vec![template_tx(3, None, 10, false)]))
        .unwrap();

    let notify = work.notify_payload().unwrap();
    assert_eq!(notify["method"], json!("mining.notify"));
    let params = notify["params"].as_array().unwrap();
    assert_eq!(params[0], json!(work.job_id()));
    assert_eq!(params[1].as_str().unwrap().len(), 64);
    // coinb1 ends right where the extranonce region starts
    assert_eq!(
        params[2].as_str().unwrap().len(),
        work.coinbase_legacy.extra_nonce_offset * 2
    );
    assert_eq!(params[4].as_array().unwrap().len(), 1);
    assert_eq!(params[8], json!(true));
}

#[test]
fn test_malformed_templates_are_refused() {
    let mut work = new_work(Chain::Btc, MiningConfig::default());

    // No result object
    let err = work.load_from_template(&json!({"error": "cold node"}));
    assert!(matches!(err, Err(AssemblyError::MalformedTemplate(_))));

    // Missing bits
    let mut template = minimal_template(vec![]);
    template["result"].as_object_mut().unwrap().remove("bits");
    assert!(work.load_from_template(&template).is_err());

    // Mistyped height
    let mut template = minimal_template(vec![]);
    template["result"]["height"] = json!("700000");
    assert!(work.load_from_template(&template).is_err());

    // Undecodable transaction payload on the checker path
    let mut bad_tx = template_tx(1, None, 0, false);
    bad_tx["data"] = json!("zz");
    let err = work.load_from_template(&minimal_template(vec![bad_tx]));
    assert!(matches!(err, Err(AssemblyError::MalformedTransaction(_))));

    assert!(!work.ready());
}

#[test]
fn test_wrong_address_size_leaves_work_unready() {
    let mut work = Work::new(7, Chain::Btc, MiningConfig::default(), &[0u8; 19], "/pool/");
    // The load itself reports no error; the work just never becomes ready
    work.load_from_template(&minimal_template(vec![])).unwrap();
    assert!(!work.ready());
}

#[test]
fn test_mutate_refreshes_time_and_notify() {
    let mut work = new_work(Chain::Btc, MiningConfig::default());
    work.load_from_template(&minimal_template(vec![])).unwrap();
    let loaded_time = work.header.time;

    work.mutate();
    assert!(work.header.time >= 1_700_000_000 || work.header.time != loaded_time);
    assert!(work.can_notify());

    let notify = work.notify_payload().unwrap();
    let params = notify["params"].as_array().unwrap();
    assert_eq!(
        params[7],
        json!(format!("{:08x}", work.header.time))
    );
}
